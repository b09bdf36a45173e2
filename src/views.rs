//! Forest Views
//!
//! Plain-text rendering of a snapshot, bounded and filtered by a policy.

use crate::model::TreeItem;
use owo_colors::OwoColorize;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Rendering policy
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ViewPolicy {
    /// Deepest level rendered; roots are depth 0
    pub max_depth: Option<usize>,
    /// Include items marked deleted (tagged `[deleted]`)
    pub show_deleted: bool,
    /// Append each item's key
    pub show_ids: bool,
    /// Style deleted items and keys with ANSI escapes
    #[serde(default)]
    pub colored: bool,
}

impl Default for ViewPolicy {
    fn default() -> Self {
        Self {
            max_depth: None,
            show_deleted: true,
            show_ids: false,
            colored: false,
        }
    }
}

/// Render a forest as an indented outline, one item per line.
///
/// Skipping an item (deleted or too deep) skips its whole subtree.
pub fn render_forest(forest: &[TreeItem], policy: &ViewPolicy) -> String {
    let mut out = String::new();
    let mut stack: Vec<(&TreeItem, usize)> = forest.iter().rev().map(|item| (item, 0)).collect();
    while let Some((item, depth)) = stack.pop() {
        if item.is_deleted && !policy.show_deleted {
            continue;
        }
        if policy.max_depth.is_some_and(|max| depth > max) {
            continue;
        }
        render_line(&mut out, item, depth, policy);
        stack.extend(item.children.iter().rev().map(|child| (child, depth + 1)));
    }
    out
}

fn render_line(out: &mut String, item: &TreeItem, depth: usize, policy: &ViewPolicy) {
    out.push_str(&"  ".repeat(depth));
    let mut line = item.title.clone();
    if item.is_deleted {
        line.push_str(" [deleted]");
    }
    match (policy.colored, item.is_deleted) {
        (true, true) => {
            let _ = write!(out, "{}", line.dimmed().strikethrough());
        }
        _ => out.push_str(&line),
    }
    if policy.show_ids {
        let id = format!("({})", item.id);
        if policy.colored {
            let _ = write!(out, " {}", id.dimmed());
        } else {
            let _ = write!(out, " {}", id);
        }
    }
    out.push('\n');
}

/// Number of items in a forest, deleted ones included.
pub fn count_items(forest: &[TreeItem]) -> usize {
    let mut stack: Vec<&TreeItem> = forest.iter().collect();
    let mut count = 0;
    while let Some(item) = stack.pop() {
        count += 1;
        stack.extend(item.children.iter());
    }
    count
}
