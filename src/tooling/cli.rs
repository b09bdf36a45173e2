//! CLI Tooling
//!
//! Command-line surface over an in-process store and cache. Commands build
//! their output as a string; the binary only prints it.

use crate::cache::{Staged, TreeCache};
use crate::config::{ConfigLoader, TreeCacheConfig};
use crate::error::ApiError;
use crate::model::{find_by_title, ApplyResult, ChangeBatch, Forest, PendingUpdate};
use crate::store::{StoreGateway, StoreHandle};
use crate::types::{ElementId, NodeKey};
use crate::views::{count_items, render_forest, ViewPolicy};
use clap::{Parser, Subcommand};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

/// Treecache CLI - tree cache with optimistic batch reconciliation
#[derive(Parser)]
#[command(name = "treecache")]
#[command(about = "Load, edit and reconcile a cached tree against a versioned store")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Configuration file path (defaults plus TREECACHE__* environment otherwise)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Emit JSON instead of text outlines
    #[arg(long)]
    pub json: bool,

    /// Style deleted items in text outlines
    #[arg(long)]
    pub color: bool,

    /// Deepest outline level printed (roots are level 0)
    #[arg(long)]
    pub depth: Option<usize>,

    /// Leave deleted items (and their subtrees) out of text outlines
    #[arg(long)]
    pub hide_deleted: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Commands {
    /// Print the seeded store tree
    Snapshot {
        /// Append each item's identifier
        #[arg(long)]
        ids: bool,
    },
    /// Run a scripted load/edit/apply session and print every step
    Demo,
}

/// Execution context shared by all commands
pub struct CliContext {
    config: TreeCacheConfig,
    json: bool,
    view: ViewPolicy,
}

impl CliContext {
    pub fn new(config_path: Option<PathBuf>, json: bool) -> Result<Self, ApiError> {
        let config = ConfigLoader::resolve(config_path.as_deref())?;
        Ok(Self::from_config(config, json))
    }

    pub fn from_config(config: TreeCacheConfig, json: bool) -> Self {
        Self {
            config,
            json,
            view: ViewPolicy::default(),
        }
    }

    /// Outline settings for text output.
    pub fn with_view(mut self, view: ViewPolicy) -> Self {
        self.view = view;
        self
    }

    /// View settings carried by the global flags.
    pub fn view_from_args(cli: &Cli) -> ViewPolicy {
        ViewPolicy {
            max_depth: cli.depth,
            show_deleted: !cli.hide_deleted,
            show_ids: false,
            colored: cli.color,
        }
    }

    pub fn config(&self) -> &TreeCacheConfig {
        &self.config
    }

    pub async fn execute(&self, command: &Commands) -> Result<String, ApiError> {
        info!(command = ?command, "Executing command");
        match command {
            Commands::Snapshot { ids } => self.snapshot(*ids).await,
            Commands::Demo => self.demo().await,
        }
    }

    async fn snapshot(&self, ids: bool) -> Result<String, ApiError> {
        let store = StoreHandle::spawn(&self.config.store);
        let forest = store.full_snapshot().await?;
        store.shutdown().await;
        if self.json {
            return Ok(to_json_string(&json!({
                "items": count_items(&forest),
                "store": forest,
            })));
        }
        let policy = ViewPolicy {
            show_ids: ids,
            ..self.view.clone()
        };
        Ok(render_forest(&forest, &policy))
    }

    async fn demo(&self) -> Result<String, ApiError> {
        let store = StoreHandle::spawn(&self.config.store);
        let gateway: Arc<dyn StoreGateway> = Arc::new(store.clone());
        let cache = TreeCache::new(Arc::clone(&gateway));
        let mut report = DemoReport::new(self.json, self.view.clone());

        let seeded = store.full_snapshot().await?;
        let id = |title: &str| -> Result<ElementId, ApiError> {
            find_by_title(&seeded, title)
                .and_then(|item| item.id.permanent())
                .ok_or_else(|| ApiError::ConfigError(format!("Seed record missing: {}", title)))
        };

        // Children first, so the graph has to link them retroactively.
        for title in ["A1-X", "A1", "A", "Root", "B", "C", "C1"] {
            cache.load_element(id(title)?).await?;
        }
        report.step("loaded", &store.full_snapshot().await?, &cache.snapshot().await, None);

        let a = NodeKey::from(id("A")?);
        cache.edit_value(a, "A (edited)").await;
        let b2 = cache.add_child(NodeKey::from(id("B")?), "B2").await;
        if let Staged::Applied(temp_id) = b2 {
            cache.add_child(NodeKey::from(temp_id), "B2-a").await;
        }
        cache.delete_subtree(NodeKey::from(id("C")?)).await;
        report.step("staged", &store.full_snapshot().await?, &cache.snapshot().await, None);

        let result = cache.apply().await?;
        report.step(
            "applied",
            &store.full_snapshot().await?,
            &cache.snapshot().await,
            Some(&result),
        );

        // Another writer moves A ahead of the cache's copy.
        let a_id = id("A")?;
        let current = store
            .fetch(a_id)
            .await?
            .map(|record| record.version)
            .unwrap_or_default();
        let outside = ChangeBatch {
            updates: [(
                a_id,
                PendingUpdate {
                    new_value: "A (outside)".to_string(),
                    expected_version: current,
                },
            )]
            .into_iter()
            .collect(),
            ..ChangeBatch::default()
        };
        gateway.apply_batch(outside).await?;

        cache.edit_value(a, "A (stale)").await;
        let result = cache.apply().await?;
        report.step(
            "stale write",
            &store.full_snapshot().await?,
            &cache.snapshot().await,
            Some(&result),
        );

        store.shutdown().await;
        Ok(report.finish())
    }
}

struct DemoReport {
    json: bool,
    policy: ViewPolicy,
    text: String,
    steps: Vec<Value>,
}

impl DemoReport {
    fn new(json: bool, policy: ViewPolicy) -> Self {
        Self {
            json,
            policy,
            text: String::new(),
            steps: Vec::new(),
        }
    }

    fn step(&mut self, name: &str, store: &Forest, cache: &Forest, result: Option<&ApplyResult>) {
        let mut conflicts: Vec<(String, String)> = result
            .map(|r| {
                r.conflicts
                    .iter()
                    .map(|(key, kind)| (key.to_string(), format!("{:?}", kind)))
                    .collect()
            })
            .unwrap_or_default();
        conflicts.sort();

        if self.json {
            self.steps.push(json!({
                "step": name,
                "store": store,
                "cache": cache,
                "created": result.map(|r| r.created_id_map.len()),
                "conflicts": conflicts
                    .iter()
                    .map(|(id, kind)| json!({ "id": id, "kind": kind }))
                    .collect::<Vec<_>>(),
            }));
            return;
        }

        self.text.push_str(&format!("== {}\n", name));
        self.text.push_str("-- store\n");
        self.text.push_str(&render_forest(store, &self.policy));
        self.text.push_str("-- cache\n");
        self.text.push_str(&render_forest(cache, &self.policy));
        if let Some(result) = result {
            self.text.push_str(&format!(
                "-- created {}, mutated {}\n",
                result.created_id_map.len(),
                result.new_versions.len()
            ));
            if conflicts.is_empty() {
                self.text.push_str("-- no conflicts\n");
            }
            for (id, kind) in &conflicts {
                self.text.push_str(&format!("-- conflict {} {}\n", id, kind));
            }
        }
    }

    fn finish(self) -> String {
        if self.json {
            to_json_string(&json!({ "steps": self.steps }))
        } else {
            self.text
        }
    }
}

fn to_json_string(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}
