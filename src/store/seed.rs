//! Demonstration hierarchy installed by `reset_to_defaults`.

use super::memory::InMemoryStore;

/// (title, parent title); parents always precede their children.
const DEFAULT_TREE: &[(&str, Option<&str>)] = &[
    ("Root", None),
    ("A", Some("Root")),
    ("B", Some("Root")),
    ("C", Some("Root")),
    ("A1", Some("A")),
    ("A2", Some("A")),
    ("B1", Some("B")),
    ("C1", Some("C")),
    ("A1-X", Some("A1")),
    ("A2-X", Some("A2")),
    ("B1-X", Some("B1")),
    ("C1-X", Some("C1")),
    ("A1-X-i", Some("A1-X")),
    ("A1-X-ii", Some("A1-X")),
];

pub(crate) fn populate(store: &mut InMemoryStore) {
    let mut by_title = std::collections::HashMap::new();
    for (title, parent) in DEFAULT_TREE {
        let parent_id = parent.and_then(|p| by_title.get(p).copied());
        let record = store.insert(parent_id, title);
        by_title.insert(*title, record.id);
    }
}
