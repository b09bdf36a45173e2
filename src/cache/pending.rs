//! Pending edit buffers
//!
//! Invariant: an identifier in `deletes` is never also in `updates`.

use crate::model::{ChangeBatch, Draft, PendingUpdate};
use crate::types::{ElementId, TempId, Version};
use std::collections::BTreeMap;

/// Entry counts of the pending buffers
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PendingSummary {
    pub creates: usize,
    pub updates: usize,
    pub deletes: usize,
}

impl PendingSummary {
    pub fn is_empty(&self) -> bool {
        self.creates == 0 && self.updates == 0 && self.deletes == 0
    }
}

#[derive(Debug, Default)]
pub(crate) struct PendingChanges {
    creates: Vec<Draft>,
    updates: BTreeMap<ElementId, PendingUpdate>,
    deletes: BTreeMap<ElementId, Version>,
}

impl PendingChanges {
    pub fn stage_create(&mut self, draft: Draft) {
        self.creates.push(draft);
    }

    pub fn draft_mut(&mut self, temp_id: &TempId) -> Option<&mut Draft> {
        self.creates.iter_mut().find(|d| d.temp_id == *temp_id)
    }

    pub fn has_draft(&self, temp_id: &TempId) -> bool {
        self.creates.iter().any(|d| d.temp_id == *temp_id)
    }

    pub fn retract_create(&mut self, temp_id: &TempId) {
        self.creates.retain(|d| d.temp_id != *temp_id);
    }

    /// Last write wins; the caller has already checked for a pending delete.
    pub fn stage_update(&mut self, id: ElementId, new_value: String, expected_version: Version) {
        self.updates.insert(
            id,
            PendingUpdate {
                new_value,
                expected_version,
            },
        );
    }

    /// Deletion supersedes any pending update for the same identifier.
    pub fn stage_delete(&mut self, id: ElementId, expected_version: Version) {
        self.updates.remove(&id);
        self.deletes.insert(id, expected_version);
    }

    pub fn update_for(&self, id: &ElementId) -> Option<&PendingUpdate> {
        self.updates.get(id)
    }

    pub fn is_delete_pending(&self, id: &ElementId) -> bool {
        self.deletes.contains_key(id)
    }

    /// Copy the buffers into a batch; the buffers themselves are untouched.
    pub fn to_batch(&self) -> ChangeBatch {
        ChangeBatch {
            creates: self.creates.clone(),
            updates: self.updates.clone(),
            deletes: self.deletes.clone(),
        }
    }

    pub fn summary(&self) -> PendingSummary {
        PendingSummary {
            creates: self.creates.len(),
            updates: self.updates.len(),
            deletes: self.deletes.len(),
        }
    }

    pub fn clear(&mut self) {
        self.creates.clear();
        self.updates.clear();
        self.deletes.clear();
    }
}
