//! Tree Cache
//!
//! A lazily populated working copy of the store's tree. Records are loaded on
//! demand, local edits are buffered, and [`TreeCache::apply`] reconciles the
//! whole buffer against the store in one batch.
//!
//! Every public call holds the state lock for its whole duration, including
//! the store round-trip, so cache operations never interleave.

mod graph;
pub mod node;
pub mod pending;

pub use node::Node;
pub use pending::PendingSummary;

use crate::error::StorageError;
use crate::model::{ApplyResult, ChangeBatch, Draft, Forest};
use crate::store::StoreGateway;
use crate::types::{ElementId, NodeKey, TempId};
use graph::NodeGraph;
use pending::PendingChanges;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Why a local edit was not staged
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclineReason {
    /// No node with that key is loaded
    UnknownNode,
    /// The node is marked deleted
    Deleted,
    /// A delete is already staged for the node
    PendingDelete,
    /// A temporary node whose create is no longer pending, e.g. one the
    /// store rejected in an earlier apply
    Unsynced,
}

/// Outcome of a local edit
///
/// Declined edits leave the cache untouched.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staged<T = ()> {
    Applied(T),
    Declined(DeclineReason),
}

impl<T> Staged<T> {
    pub fn is_applied(&self) -> bool {
        matches!(self, Staged::Applied(_))
    }

    pub fn applied(self) -> Option<T> {
        match self {
            Staged::Applied(value) => Some(value),
            Staged::Declined(_) => None,
        }
    }

    pub fn declined(&self) -> Option<DeclineReason> {
        match self {
            Staged::Applied(_) => None,
            Staged::Declined(reason) => Some(*reason),
        }
    }
}

#[derive(Default)]
struct CacheState {
    graph: NodeGraph,
    pending: PendingChanges,
}

impl CacheState {
    /// Put local pending state back on top of a freshly fetched payload.
    fn overlay_pending(&mut self, id: ElementId) {
        let key = NodeKey::Permanent(id);
        let update = self.pending.update_for(&id).map(|u| u.new_value.clone());
        let deleted = self.pending.is_delete_pending(&id);
        if let Some(node) = self.graph.get_mut(&key) {
            if let Some(value) = update {
                node.value = value;
            }
            if deleted {
                node.is_deleted = true;
            }
        }
    }
}

/// Client-side working copy bound to one store
pub struct TreeCache {
    store: Arc<dyn StoreGateway>,
    state: Mutex<CacheState>,
}

impl TreeCache {
    pub fn new(store: Arc<dyn StoreGateway>) -> Self {
        Self {
            store,
            state: Mutex::new(CacheState::default()),
        }
    }

    /// Fetch one record and merge it into the graph.
    ///
    /// Returns `Ok(None)` without touching the cache when the store has no
    /// such record. Records may be loaded in any order.
    pub async fn load_element(&self, id: ElementId) -> Result<Option<Node>, StorageError> {
        let mut state = self.state.lock().await;
        let Some(record) = self.store.fetch(id).await? else {
            debug!(id = %id, "Record not found in store");
            return Ok(None);
        };
        let key = state.graph.upsert_record(record);
        state.overlay_pending(id);
        debug!(
            id = %id,
            nodes = state.graph.len(),
            waiting = state.graph.waiting_count(),
            "Loaded record"
        );
        Ok(state.graph.get(&key).cloned())
    }

    /// Stage a new value for a loaded node and show it immediately.
    pub async fn edit_value(&self, key: NodeKey, new_value: impl Into<String>) -> Staged {
        let new_value = new_value.into();
        let mut state = self.state.lock().await;
        let state = &mut *state;
        let Some(node) = state.graph.get_mut(&key) else {
            return decline("edit_value", key, DeclineReason::UnknownNode);
        };
        match key {
            NodeKey::Permanent(id) => {
                if state.pending.is_delete_pending(&id) {
                    return decline("edit_value", key, DeclineReason::PendingDelete);
                }
                if node.is_deleted {
                    return decline("edit_value", key, DeclineReason::Deleted);
                }
                state
                    .pending
                    .stage_update(id, new_value.clone(), node.version);
            }
            NodeKey::Temporary(temp_id) => {
                if node.is_deleted {
                    return decline("edit_value", key, DeclineReason::Deleted);
                }
                let Some(draft) = state.pending.draft_mut(&temp_id) else {
                    return decline("edit_value", key, DeclineReason::Unsynced);
                };
                draft.value = new_value.clone();
            }
        }
        node.value = new_value;
        debug!(key = %key, "Staged value edit");
        Staged::Applied(())
    }

    /// Draft a new child under a loaded, live parent.
    ///
    /// The parent may itself be a draft; the store resolves it within the
    /// same batch.
    pub async fn add_child(&self, parent: NodeKey, value: impl Into<String>) -> Staged<TempId> {
        let value = value.into();
        let mut state = self.state.lock().await;
        let Some(parent_node) = state.graph.get(&parent) else {
            return decline("add_child", parent, DeclineReason::UnknownNode);
        };
        if parent_node.is_deleted {
            return decline("add_child", parent, DeclineReason::Deleted);
        }
        match parent {
            NodeKey::Permanent(id) if state.pending.is_delete_pending(&id) => {
                return decline("add_child", parent, DeclineReason::PendingDelete);
            }
            NodeKey::Temporary(temp_id) if !state.pending.has_draft(&temp_id) => {
                return decline("add_child", parent, DeclineReason::Unsynced);
            }
            _ => {}
        }

        let temp_id = TempId::mint();
        state.pending.stage_create(Draft {
            temp_id,
            parent,
            value: value.clone(),
        });
        state.graph.insert_draft(Node::draft(temp_id, parent, value));
        debug!(parent = %parent, temp_id = %temp_id, "Staged child create");
        Staged::Applied(temp_id)
    }

    /// Mark a node and its loaded descendants deleted.
    ///
    /// Persisted nodes get a delete entry carrying their current version;
    /// drafts are simply retracted. Nodes already marked deleted stop the
    /// cascade. Returns the number of nodes marked.
    pub async fn delete_subtree(&self, key: NodeKey) -> Staged<usize> {
        let mut state = self.state.lock().await;
        let state = &mut *state;
        let Some(root) = state.graph.get(&key) else {
            return decline("delete_subtree", key, DeclineReason::UnknownNode);
        };
        if let NodeKey::Permanent(id) = key {
            if state.pending.is_delete_pending(&id) {
                return decline("delete_subtree", key, DeclineReason::PendingDelete);
            }
        }
        if root.is_deleted {
            return decline("delete_subtree", key, DeclineReason::Deleted);
        }

        let mut marked = 0;
        let mut stack = vec![key];
        while let Some(current) = stack.pop() {
            let Some(node) = state.graph.get_mut(&current) else {
                continue;
            };
            if node.is_deleted {
                continue;
            }
            node.is_deleted = true;
            marked += 1;
            match current {
                NodeKey::Permanent(id) => state.pending.stage_delete(id, node.version),
                NodeKey::Temporary(temp_id) => state.pending.retract_create(&temp_id),
            }
            stack.extend(node.children.iter().rev().copied());
        }
        debug!(key = %key, marked, "Staged subtree delete");
        Staged::Applied(marked)
    }

    /// Send every pending edit to the store in one batch.
    ///
    /// On success drafts move to their permanent keys, versions are refreshed
    /// and all buffers are cleared, conflicted items included. On failure the
    /// cache is left exactly as it was.
    pub async fn apply(&self) -> Result<ApplyResult, StorageError> {
        let mut state = self.state.lock().await;
        let batch = state.pending.to_batch();
        let summary = state.pending.summary();
        let result = self.store.apply_batch(batch).await?;

        for (temp_id, id) in &result.created_id_map {
            let version = result.new_versions.get(id).copied().unwrap_or(1);
            if let Some(node) = state
                .graph
                .relocate(&NodeKey::Temporary(*temp_id), NodeKey::Permanent(*id))
            {
                node.version = version;
            }
        }
        for (id, version) in &result.new_versions {
            if let Some(node) = state.graph.get_mut(&NodeKey::Permanent(*id)) {
                node.version = *version;
            }
        }
        state.pending.clear();

        if result.has_conflicts() {
            warn!(
                conflicts = result.conflicts.len(),
                creates = summary.creates,
                updates = summary.updates,
                deletes = summary.deletes,
                "Applied with conflicts"
            );
        } else {
            info!(
                creates = summary.creates,
                updates = summary.updates,
                deletes = summary.deletes,
                "Applied pending changes"
            );
        }
        Ok(result)
    }

    /// Drop every node, link index and pending edit.
    pub async fn clear_all(&self) {
        let mut state = self.state.lock().await;
        state.graph.clear();
        state.pending.clear();
        info!("Cache cleared");
    }

    /// Title-sorted forest of the loaded nodes.
    pub async fn snapshot(&self) -> Forest {
        self.state.lock().await.graph.snapshot()
    }

    /// Value copy of a node.
    pub async fn node(&self, key: NodeKey) -> Option<Node> {
        self.state.lock().await.graph.get(&key).cloned()
    }

    pub async fn pending(&self) -> PendingSummary {
        self.state.lock().await.pending.summary()
    }

    /// Copy of the batch `apply` would send right now.
    pub async fn pending_batch(&self) -> ChangeBatch {
        self.state.lock().await.pending.to_batch()
    }

    pub async fn len(&self) -> usize {
        self.state.lock().await.graph.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}

fn decline<T>(operation: &'static str, key: NodeKey, reason: DeclineReason) -> Staged<T> {
    warn!(operation, key = %key, reason = ?reason, "Local edit declined");
    Staged::Declined(reason)
}
