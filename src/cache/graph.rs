//! Node table with out-of-order linking.
//!
//! Records may arrive in any order. A node whose parent is not loaded yet is
//! parked in `awaiting_parent` under the missing parent's key, and
//! `waiting_on` remembers the reverse direction. Both are drained when the
//! awaited node arrives.

use super::node::Node;
use crate::model::{Forest, Record, TreeItem};
use crate::types::NodeKey;
use std::collections::{BTreeSet, HashMap};

#[derive(Debug, Default)]
pub(crate) struct NodeGraph {
    nodes: HashMap<NodeKey, Node>,
    /// missing parent -> children waiting for it
    awaiting_parent: HashMap<NodeKey, BTreeSet<NodeKey>>,
    /// waiting child -> missing parent
    waiting_on: HashMap<NodeKey, NodeKey>,
}

impl NodeGraph {
    pub fn get(&self, key: &NodeKey) -> Option<&Node> {
        self.nodes.get(key)
    }

    pub fn get_mut(&mut self, key: &NodeKey) -> Option<&mut Node> {
        self.nodes.get_mut(key)
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn waiting_count(&self) -> usize {
        self.waiting_on.len()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.awaiting_parent.clear();
        self.waiting_on.clear();
    }

    /// Insert or refresh the node for a fetched record and resolve its links.
    pub fn upsert_record(&mut self, record: Record) -> NodeKey {
        let key = NodeKey::Permanent(record.id);
        match self.nodes.get_mut(&key) {
            Some(node) => {
                let previous_parent = node.parent_key;
                node.refresh(record);
                if node.parent_key != previous_parent {
                    self.detach(&key);
                    self.attach(&key);
                }
            }
            None => {
                self.nodes.insert(key, Node::from_record(record));
                self.attach(&key);
            }
        }
        self.link_waiting_children(&key);
        key
    }

    /// Insert a locally created node; its parent is expected to be present.
    pub fn insert_draft(&mut self, node: Node) {
        let key = node.key;
        self.nodes.insert(key, node);
        self.attach(&key);
    }

    /// Move a node to a new key, rewriting the edges that point at it.
    pub fn relocate(&mut self, from: &NodeKey, to: NodeKey) -> Option<&mut Node> {
        let mut node = self.nodes.remove(from)?;
        node.key = to;
        if let Some(parent) = node.parent {
            if let Some(parent) = self.nodes.get_mut(&parent) {
                parent.children.remove(from);
                parent.children.insert(to);
            }
        }
        for child in &node.children {
            if let Some(child) = self.nodes.get_mut(child) {
                child.parent = Some(to);
                child.parent_key = Some(to);
            }
        }
        if let Some(missing) = self.waiting_on.remove(from) {
            if let Some(waiting) = self.awaiting_parent.get_mut(&missing) {
                waiting.remove(from);
                waiting.insert(to);
            }
            self.waiting_on.insert(to, missing);
        }
        self.nodes.insert(to, node);
        self.link_waiting_children(&to);
        self.nodes.get_mut(&to)
    }

    /// Link `key` under its declared parent, or park it until the parent loads.
    fn attach(&mut self, key: &NodeKey) {
        let Some(parent_key) = self.nodes.get(key).and_then(|n| n.parent_key) else {
            return;
        };
        match self.nodes.get_mut(&parent_key) {
            Some(parent) => {
                parent.children.insert(*key);
                if let Some(node) = self.nodes.get_mut(key) {
                    node.parent = Some(parent_key);
                }
            }
            None => {
                self.awaiting_parent
                    .entry(parent_key)
                    .or_default()
                    .insert(*key);
                self.waiting_on.insert(*key, parent_key);
            }
        }
    }

    /// Undo whatever `attach` did for `key`.
    fn detach(&mut self, key: &NodeKey) {
        let linked = self.nodes.get_mut(key).and_then(|n| n.parent.take());
        if let Some(parent) = linked.and_then(|p| self.nodes.get_mut(&p)) {
            parent.children.remove(key);
        }
        if let Some(missing) = self.waiting_on.remove(key) {
            if let Some(waiting) = self.awaiting_parent.get_mut(&missing) {
                waiting.remove(key);
                if waiting.is_empty() {
                    self.awaiting_parent.remove(&missing);
                }
            }
        }
    }

    /// Link every node that was waiting for `key` to arrive.
    fn link_waiting_children(&mut self, key: &NodeKey) {
        let Some(waiting) = self.awaiting_parent.remove(key) else {
            return;
        };
        for child in &waiting {
            self.waiting_on.remove(child);
            if let Some(node) = self.nodes.get_mut(child) {
                node.parent = Some(*key);
            }
        }
        if let Some(parent) = self.nodes.get_mut(key) {
            parent.children.extend(waiting);
        }
    }

    /// Forest of every loaded node, sorted by title at each level.
    ///
    /// Roots are nodes without a declared parent and nodes whose parent is not
    /// loaded.
    pub fn snapshot(&self) -> Forest {
        let roots = self
            .nodes
            .values()
            .filter(|n| n.parent_key.map_or(true, |p| !self.nodes.contains_key(&p)));
        let mut items: Vec<TreeItem> = roots.filter_map(|n| self.build_item(n)).collect();
        sort_items(&mut items);
        items
    }

    /// Build the item for `root` bottom-up with an explicit stack, sorting
    /// each level's children once they are all built.
    fn build_item(&self, root: &Node) -> Option<TreeItem> {
        let mut stack = vec![(leaf_item(root), root.children.iter())];
        while let Some((_, pending)) = stack.last_mut() {
            if let Some(child) = pending.next() {
                if let Some(node) = self.nodes.get(child) {
                    stack.push((leaf_item(node), node.children.iter()));
                }
                continue;
            }
            let Some((mut item, _)) = stack.pop() else {
                break;
            };
            sort_items(&mut item.children);
            match stack.last_mut() {
                Some((parent, _)) => parent.children.push(item),
                None => return Some(item),
            }
        }
        None
    }
}

fn leaf_item(node: &Node) -> TreeItem {
    TreeItem {
        id: node.key,
        title: node.value.clone(),
        is_deleted: node.is_deleted,
        children: Vec::new(),
    }
}

/// Title order; ties fall back to the key so output is deterministic.
fn sort_items(items: &mut [TreeItem]) {
    items.sort_by(|a, b| a.title.cmp(&b.title).then_with(|| a.id.cmp(&b.id)));
}
