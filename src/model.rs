//! Shared data model: records, change batches, apply results and snapshots.

use crate::types::{ElementId, NodeKey, TempId, Version};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

/// Record: the canonical, versioned unit owned by the store
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: ElementId,
    /// None marks a root
    pub parent_id: Option<ElementId>,
    pub value: String,
    pub is_deleted: bool,
    pub version: Version,
}

/// Draft: a locally staged create awaiting a permanent identifier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Draft {
    pub temp_id: TempId,
    /// Either a persisted parent or an earlier draft in the same batch
    pub parent: NodeKey,
    pub value: String,
}

/// Staged value change guarded by the version it was based on
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingUpdate {
    pub new_value: String,
    pub expected_version: Version,
}

/// ChangeBatch: reconciliation request, owned by value
///
/// Creates keep staging order. Updates and deletes are keyed by identifier,
/// ordered so that a batch is processed the same way on every run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangeBatch {
    pub creates: Vec<Draft>,
    pub updates: BTreeMap<ElementId, PendingUpdate>,
    /// identifier -> expected version
    pub deletes: BTreeMap<ElementId, Version>,
}

impl ChangeBatch {
    pub fn is_empty(&self) -> bool {
        self.creates.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }
}

/// Reason a single mutation in a batch was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConflictKind {
    /// Expected version is stale
    VersionMismatch,
    /// Target does not exist or is already deleted
    NotFound,
    /// A create's parent is missing or soft-deleted
    ParentDeleted,
}

/// ApplyResult: authoritative outcome of one batch
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyResult {
    pub created_id_map: HashMap<TempId, ElementId>,
    /// Every identifier mutated by the batch, with its version afterwards
    pub new_versions: HashMap<ElementId, Version>,
    /// Rejected creates are keyed by their temporary identifier
    pub conflicts: HashMap<NodeKey, ConflictKind>,
}

impl ApplyResult {
    pub fn has_conflicts(&self) -> bool {
        !self.conflicts.is_empty()
    }
}

/// Display item of a snapshot
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TreeItem {
    pub id: NodeKey,
    pub title: String,
    pub is_deleted: bool,
    pub children: Vec<TreeItem>,
}

impl TreeItem {
    /// Depth-first search for an item by title.
    pub fn find_by_title(&self, title: &str) -> Option<&TreeItem> {
        find_in(std::slice::from_ref(self), |item| item.title == title)
    }
}

impl Drop for TreeItem {
    /// Flattens descendants onto a heap stack so deep chains drop without
    /// recursing once per level.
    fn drop(&mut self) {
        let mut stack = std::mem::take(&mut self.children);
        while let Some(mut item) = stack.pop() {
            stack.append(&mut item.children);
        }
    }
}

/// Forest: ordered roots of a snapshot
pub type Forest = Vec<TreeItem>;

/// Find an item anywhere in a forest by title.
pub fn find_by_title<'a>(forest: &'a [TreeItem], title: &str) -> Option<&'a TreeItem> {
    find_in(forest, |item| item.title == title)
}

/// Find an item anywhere in a forest by key.
pub fn find_by_key(forest: &[TreeItem], key: NodeKey) -> Option<&TreeItem> {
    find_in(forest, |item| item.id == key)
}

/// Pre-order search over an explicit stack.
fn find_in<'a>(
    forest: &'a [TreeItem],
    matches: impl Fn(&TreeItem) -> bool,
) -> Option<&'a TreeItem> {
    let mut stack: Vec<&TreeItem> = forest.iter().rev().collect();
    while let Some(item) = stack.pop() {
        if matches(item) {
            return Some(item);
        }
        stack.extend(item.children.iter().rev());
    }
    None
}
