//! In-memory record table with optimistic concurrency control.
//!
//! This is the synchronous state machine behind [`StoreHandle`](super::StoreHandle).
//! It never touches the async runtime; serialization of calls is the handle's job.

use crate::model::{ApplyResult, ChangeBatch, ConflictKind, Forest, Record, TreeItem};
use crate::types::{ElementId, IdMint, IdStrategy, NodeKey};
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Canonical record storage
pub struct InMemoryStore {
    records: HashMap<ElementId, Record>,
    /// parent -> children, insertion order
    children: HashMap<ElementId, Vec<ElementId>>,
    roots: Vec<ElementId>,
    mint: IdMint,
}

impl InMemoryStore {
    /// Create an empty store.
    pub fn new(strategy: IdStrategy) -> Self {
        Self {
            records: HashMap::new(),
            children: HashMap::new(),
            roots: Vec::new(),
            mint: IdMint::new(strategy),
        }
    }

    /// Create a store populated with the demonstration hierarchy.
    pub fn seeded(strategy: IdStrategy) -> Self {
        let mut store = Self::new(strategy);
        store.reset_to_defaults();
        store
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn roots(&self) -> &[ElementId] {
        &self.roots
    }

    /// Pure lookup, returns a value copy.
    pub fn fetch(&self, id: &ElementId) -> Option<Record> {
        self.records.get(id).cloned()
    }

    /// Insert a fresh record at version 1 and index it under its parent.
    ///
    /// Parentless records become roots. The caller validates the parent.
    pub(crate) fn insert(&mut self, parent_id: Option<ElementId>, value: &str) -> Record {
        let record = Record {
            id: self.mint.mint(),
            parent_id,
            value: value.to_string(),
            is_deleted: false,
            version: 1,
        };
        self.records.insert(record.id, record.clone());
        match parent_id {
            Some(parent) => self.children.entry(parent).or_default().push(record.id),
            None => self.roots.push(record.id),
        }
        record
    }

    /// Clear all state and re-seed the demonstration hierarchy.
    pub fn reset_to_defaults(&mut self) {
        self.records.clear();
        self.children.clear();
        self.roots.clear();
        self.mint.reset();
        super::seed::populate(self);
        info!(records = self.records.len(), "Store reset to defaults");
    }

    /// Validate and apply a batch: creates, then updates, then deletes.
    ///
    /// Each phase runs to completion before the next one starts. A rejected
    /// item is recorded as a conflict and skipped; it never blocks other items.
    pub fn apply_batch(&mut self, batch: ChangeBatch) -> ApplyResult {
        let mut result = ApplyResult::default();

        for draft in batch.creates {
            let parent = match draft.parent {
                NodeKey::Permanent(id) => Some(id),
                NodeKey::Temporary(temp) => result.created_id_map.get(&temp).copied(),
            };
            let parent = match parent.and_then(|id| self.records.get(&id)) {
                Some(record) if !record.is_deleted => record.id,
                _ => {
                    result
                        .conflicts
                        .insert(NodeKey::Temporary(draft.temp_id), ConflictKind::ParentDeleted);
                    continue;
                }
            };
            let record = self.insert(Some(parent), &draft.value);
            debug!(temp_id = %draft.temp_id, id = %record.id, "Created record");
            result.created_id_map.insert(draft.temp_id, record.id);
            result.new_versions.insert(record.id, record.version);
        }

        for (id, update) in batch.updates {
            let Some(record) = self.records.get_mut(&id) else {
                result.conflicts.insert(id.into(), ConflictKind::NotFound);
                continue;
            };
            if record.version != update.expected_version {
                result.conflicts.insert(id.into(), ConflictKind::VersionMismatch);
                continue;
            }
            if record.is_deleted {
                result.conflicts.insert(id.into(), ConflictKind::NotFound);
                continue;
            }
            record.value = update.new_value;
            record.version += 1;
            result.new_versions.insert(id, record.version);
        }

        for (id, expected_version) in batch.deletes {
            let Some(record) = self.records.get(&id) else {
                result.conflicts.insert(id.into(), ConflictKind::NotFound);
                continue;
            };
            if record.version != expected_version {
                result.conflicts.insert(id.into(), ConflictKind::VersionMismatch);
                continue;
            }
            let marked = self.cascade_delete(id);
            if let Some(record) = self.records.get_mut(&id) {
                record.version += 1;
                result.new_versions.insert(id, record.version);
            }
            debug!(id = %id, marked, "Cascade delete");
        }

        if result.has_conflicts() {
            warn!(
                conflicts = result.conflicts.len(),
                created = result.created_id_map.len(),
                "Batch applied with conflicts"
            );
        } else {
            info!(
                created = result.created_id_map.len(),
                mutated = result.new_versions.len(),
                "Batch applied"
            );
        }
        result
    }

    /// Soft-delete `root` and every live descendant, depth-first.
    ///
    /// Recursion stops at records that are already deleted. Versions are left
    /// alone; the caller bumps the cascade root only. Returns the number of
    /// records newly marked.
    fn cascade_delete(&mut self, root: ElementId) -> usize {
        let mut marked = 0;
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            match self.records.get_mut(&id) {
                Some(record) if !record.is_deleted => record.is_deleted = true,
                _ => continue,
            }
            marked += 1;
            if let Some(kids) = self.children.get(&id) {
                stack.extend(kids.iter().rev().copied());
            }
        }
        marked
    }

    /// Rebuild the whole forest in insertion order from the children index.
    pub fn full_snapshot(&self) -> Forest {
        self.roots.iter().filter_map(|id| self.build_item(id)).collect()
    }

    /// Build the item for `root` bottom-up with an explicit stack.
    ///
    /// Each frame holds a partly built item and the children still to visit;
    /// a finished frame is pushed onto its parent's children.
    fn build_item(&self, root: &ElementId) -> Option<TreeItem> {
        let record = self.records.get(root)?;
        let mut stack = vec![(leaf_item(record), self.child_ids(root))];
        while let Some((_, pending)) = stack.last_mut() {
            if let Some(child) = pending.next() {
                if let Some(record) = self.records.get(child) {
                    stack.push((leaf_item(record), self.child_ids(child)));
                }
                continue;
            }
            let Some((item, _)) = stack.pop() else {
                break;
            };
            match stack.last_mut() {
                Some((parent, _)) => parent.children.push(item),
                None => return Some(item),
            }
        }
        None
    }

    fn child_ids(&self, id: &ElementId) -> std::slice::Iter<'_, ElementId> {
        self.children
            .get(id)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
    }
}

fn leaf_item(record: &Record) -> TreeItem {
    TreeItem {
        id: NodeKey::Permanent(record.id),
        title: record.value.clone(),
        is_deleted: record.is_deleted,
        children: Vec::new(),
    }
}
