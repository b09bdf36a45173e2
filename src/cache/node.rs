//! Cache node: a record payload plus graph edges.

use crate::model::Record;
use crate::types::{NodeKey, TempId, Version, DRAFT_VERSION};
use std::collections::BTreeSet;

/// Node: the cache's working copy of a record
///
/// Edges are keys into the cache's node table. `parent` is set only while the
/// parent node is present, so it never keeps an ancestor alive; `children` is
/// the exclusive set of linked child nodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Node {
    pub key: NodeKey,
    /// Declared parent from the record (or draft)
    pub parent_key: Option<NodeKey>,
    pub value: String,
    pub is_deleted: bool,
    pub version: Version,
    pub(crate) parent: Option<NodeKey>,
    pub(crate) children: BTreeSet<NodeKey>,
}

impl Node {
    pub fn from_record(record: Record) -> Self {
        Self {
            key: NodeKey::Permanent(record.id),
            parent_key: record.parent_id.map(NodeKey::Permanent),
            value: record.value,
            is_deleted: record.is_deleted,
            version: record.version,
            parent: None,
            children: BTreeSet::new(),
        }
    }

    /// Provisional node for a local create.
    pub fn draft(temp_id: TempId, parent: NodeKey, value: String) -> Self {
        Self {
            key: NodeKey::Temporary(temp_id),
            parent_key: Some(parent),
            value,
            is_deleted: false,
            version: DRAFT_VERSION,
            parent: None,
            children: BTreeSet::new(),
        }
    }

    /// Replace the payload, keeping graph edges.
    pub(crate) fn refresh(&mut self, record: Record) {
        self.parent_key = record.parent_id.map(NodeKey::Permanent);
        self.value = record.value;
        self.is_deleted = record.is_deleted;
        self.version = record.version;
    }

    /// Linked parent, if it is loaded
    pub fn parent(&self) -> Option<NodeKey> {
        self.parent
    }

    pub fn children(&self) -> impl Iterator<Item = &NodeKey> {
        self.children.iter()
    }

    pub fn child_count(&self) -> usize {
        self.children.len()
    }
}
