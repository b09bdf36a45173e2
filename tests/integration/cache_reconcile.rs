use treecache::model::{find_by_key, find_by_title};
use treecache::types::DRAFT_VERSION;
use treecache::{ChangeBatch, ConflictKind, DeclineReason, NodeKey, StoreGateway, StorageError};

use super::support::{chain_depth, child_titles, is_title_sorted, Fixture};

#[tokio::test]
async fn created_child_moves_to_permanent_key() {
    let fixture = Fixture::new().await;
    fixture.load(&["Root", "B"]).await;

    let temp_id = fixture
        .cache
        .add_child(fixture.key("B"), "B2")
        .await
        .applied()
        .unwrap();
    let draft = fixture.cache.node(NodeKey::from(temp_id)).await.unwrap();
    assert_eq!(draft.version, DRAFT_VERSION);
    let snapshot = fixture.cache.snapshot().await;
    assert_eq!(child_titles(find_by_title(&snapshot, "B").unwrap()), vec!["B2"]);

    let result = fixture.cache.apply().await.unwrap();
    let id = result.created_id_map[&temp_id];
    assert!(fixture.cache.node(NodeKey::from(temp_id)).await.is_none());
    let node = fixture.cache.node(NodeKey::from(id)).await.unwrap();
    assert_eq!(node.version, result.new_versions[&id]);
    assert_eq!(node.parent(), Some(fixture.key("B")));

    let record = fixture.store.fetch(id).await.unwrap().unwrap();
    assert_eq!(record.value, "B2");
    assert_eq!(record.parent_id, Some(fixture.id("B")));
    assert!(fixture.cache.pending().await.is_empty());
}

#[tokio::test]
async fn nested_drafts_are_created_in_one_batch() {
    let fixture = Fixture::new().await;
    fixture.load(&["C"]).await;

    let outer = fixture
        .cache
        .add_child(fixture.key("C"), "C2")
        .await
        .applied()
        .unwrap();
    let inner = fixture
        .cache
        .add_child(NodeKey::from(outer), "C2-a")
        .await
        .applied()
        .unwrap();

    let result = fixture.cache.apply().await.unwrap();
    assert!(result.conflicts.is_empty());
    let outer_id = result.created_id_map[&outer];
    let inner_id = result.created_id_map[&inner];
    let inner_node = fixture.cache.node(NodeKey::from(inner_id)).await.unwrap();
    assert_eq!(inner_node.parent(), Some(NodeKey::from(outer_id)));
    let record = fixture.store.fetch(inner_id).await.unwrap().unwrap();
    assert_eq!(record.parent_id, Some(outer_id));
}

#[tokio::test]
async fn edit_is_shown_then_persisted() {
    let fixture = Fixture::new().await;
    fixture.load(&["A"]).await;
    let a = fixture.key("A");

    assert!(fixture.cache.edit_value(a, "Alpha").await.is_applied());
    assert_eq!(fixture.cache.node(a).await.unwrap().value, "Alpha");
    let batch = fixture.cache.pending_batch().await;
    assert_eq!(batch.updates[&fixture.id("A")].expected_version, 1);

    let result = fixture.cache.apply().await.unwrap();
    assert_eq!(result.new_versions[&fixture.id("A")], 2);
    assert_eq!(fixture.cache.node(a).await.unwrap().version, 2);
    let record = fixture.store.fetch(fixture.id("A")).await.unwrap().unwrap();
    assert_eq!(record.value, "Alpha");
}

#[tokio::test]
async fn delete_supersedes_pending_edits() {
    let fixture = Fixture::new().await;
    fixture.load(&["A", "A1", "A2", "A1-X"]).await;

    fixture.cache.edit_value(fixture.key("A1"), "edited").await;
    let marked = fixture
        .cache
        .delete_subtree(fixture.key("A"))
        .await
        .applied()
        .unwrap();
    assert_eq!(marked, 4);

    let batch = fixture.cache.pending_batch().await;
    assert!(batch.updates.is_empty());
    assert_eq!(batch.deletes.len(), 4);
    assert!(batch.deletes.values().all(|v| *v == 1));

    let edit = fixture.cache.edit_value(fixture.key("A1"), "again").await;
    assert_eq!(edit.declined(), Some(DeclineReason::PendingDelete));
    let again = fixture.cache.delete_subtree(fixture.key("A")).await;
    assert_eq!(again.declined(), Some(DeclineReason::PendingDelete));
    let child = fixture.cache.add_child(fixture.key("A2"), "x").await;
    assert!(!child.is_applied());

    let snapshot = fixture.cache.snapshot().await;
    assert!(find_by_title(&snapshot, "A").unwrap().is_deleted);
    assert!(find_by_title(&snapshot, "A1-X").unwrap().is_deleted);

    let result = fixture.cache.apply().await.unwrap();
    assert!(result.conflicts.is_empty());
    let forest = fixture.store.full_snapshot().await.unwrap();
    assert!(find_by_title(&forest, "A1-X-ii").unwrap().is_deleted);
    assert!(!find_by_title(&forest, "B").unwrap().is_deleted);
}

#[tokio::test]
async fn deleting_a_draft_retracts_it() {
    let fixture = Fixture::new().await;
    fixture.load(&["B"]).await;
    let temp_id = fixture
        .cache
        .add_child(fixture.key("B"), "short-lived")
        .await
        .applied()
        .unwrap();

    fixture.cache.delete_subtree(NodeKey::from(temp_id)).await;
    assert!(fixture.cache.pending().await.is_empty());
    let edit = fixture.cache.edit_value(NodeKey::from(temp_id), "x").await;
    assert_eq!(edit.declined(), Some(DeclineReason::Deleted));

    let result = fixture.cache.apply().await.unwrap();
    assert!(result.created_id_map.is_empty());
}

#[tokio::test]
async fn guards_on_missing_nodes() {
    let fixture = Fixture::new().await;
    let unknown = fixture.key("A");

    let edit = fixture.cache.edit_value(unknown, "x").await;
    assert_eq!(edit.declined(), Some(DeclineReason::UnknownNode));
    let add = fixture.cache.add_child(unknown, "x").await;
    assert_eq!(add.declined(), Some(DeclineReason::UnknownNode));
    let delete = fixture.cache.delete_subtree(unknown).await;
    assert_eq!(delete.declined(), Some(DeclineReason::UnknownNode));

    assert!(fixture.cache.is_empty().await);
    assert!(fixture.cache.pending().await.is_empty());
}

#[tokio::test]
async fn add_child_under_server_deleted_parent_is_declined() {
    let fixture = Fixture::new().await;
    fixture
        .store
        .apply_batch(ChangeBatch {
            deletes: [(fixture.id("C"), 1)].into_iter().collect(),
            ..ChangeBatch::default()
        })
        .await
        .unwrap();
    fixture.load(&["C"]).await;

    let add = fixture.cache.add_child(fixture.key("C"), "late").await;
    assert_eq!(add.declined(), Some(DeclineReason::Deleted));
}

#[tokio::test]
async fn create_under_parent_deleted_elsewhere_conflicts() {
    let fixture = Fixture::new().await;
    fixture.load(&["B1"]).await;
    let temp_id = fixture
        .cache
        .add_child(fixture.key("B1"), "orphan")
        .await
        .applied()
        .unwrap();

    fixture
        .store
        .apply_batch(ChangeBatch {
            deletes: [(fixture.id("B"), 1)].into_iter().collect(),
            ..ChangeBatch::default()
        })
        .await
        .unwrap();

    let result = fixture.cache.apply().await.unwrap();
    assert!(result.created_id_map.is_empty());
    assert_eq!(
        result.conflicts[&NodeKey::from(temp_id)],
        ConflictKind::ParentDeleted
    );
    // Not re-queued; the provisional node stays for the caller to resolve.
    assert!(fixture.cache.pending().await.is_empty());
    let node = fixture.cache.node(NodeKey::from(temp_id)).await.unwrap();
    assert_eq!(node.version, DRAFT_VERSION);
    assert!(!node.is_deleted);

    // The store never saw it, so further local edits have nothing to ride on.
    let edit = fixture.cache.edit_value(NodeKey::from(temp_id), "renamed").await;
    assert_eq!(edit.declined(), Some(DeclineReason::Unsynced));
    let add = fixture.cache.add_child(NodeKey::from(temp_id), "nested").await;
    assert_eq!(add.declined(), Some(DeclineReason::Unsynced));
    assert!(fixture.cache.pending().await.is_empty());
    let node = fixture.cache.node(NodeKey::from(temp_id)).await.unwrap();
    assert_eq!(node.value, "orphan");
}

#[tokio::test]
async fn stale_edit_reports_conflict_and_clears_buffer() {
    let fixture = Fixture::new().await;
    fixture.load(&["A"]).await;
    let a = fixture.id("A");

    let mut outside = ChangeBatch::default();
    outside.updates.insert(
        a,
        treecache::PendingUpdate {
            new_value: "outside".to_string(),
            expected_version: 1,
        },
    );
    fixture.store.apply_batch(outside).await.unwrap();

    fixture.cache.edit_value(NodeKey::from(a), "mine").await;
    let result = fixture.cache.apply().await.unwrap();
    assert_eq!(result.conflicts[&NodeKey::from(a)], ConflictKind::VersionMismatch);
    assert!(fixture.cache.pending().await.is_empty());
    assert_eq!(fixture.store.fetch(a).await.unwrap().unwrap().value, "outside");

    // Reloading picks up the store's version, so a redo succeeds.
    let node = fixture.cache.load_element(a).await.unwrap().unwrap();
    assert_eq!(node.version, 2);
    assert_eq!(node.value, "outside");
    fixture.cache.edit_value(NodeKey::from(a), "mine").await;
    let result = fixture.cache.apply().await.unwrap();
    assert!(result.conflicts.is_empty());
    assert_eq!(result.new_versions[&a], 3);
}

#[tokio::test]
async fn reload_keeps_local_overlay() {
    let fixture = Fixture::new().await;
    fixture.load(&["B", "B1"]).await;
    fixture.cache.edit_value(fixture.key("B1"), "local").await;
    fixture.cache.delete_subtree(fixture.key("B")).await;
    fixture.cache.add_child(fixture.key("B1"), "ignored").await;

    let b = fixture.cache.load_element(fixture.id("B")).await.unwrap().unwrap();
    assert!(b.is_deleted);
    let b1 = fixture.cache.load_element(fixture.id("B1")).await.unwrap().unwrap();
    assert!(b1.is_deleted);
    assert_eq!(b1.version, 1);
}

#[tokio::test]
async fn reload_shows_pending_edit() {
    let fixture = Fixture::new().await;
    fixture.load(&["C1"]).await;
    fixture.cache.edit_value(fixture.key("C1"), "draft text").await;

    let node = fixture.cache.load_element(fixture.id("C1")).await.unwrap().unwrap();
    assert_eq!(node.value, "draft text");
    assert_eq!(fixture.cache.pending().await.updates, 1);
}

#[tokio::test]
async fn failed_apply_leaves_pending_state_untouched() {
    let fixture = Fixture::new().await;
    fixture.load(&["Root", "A", "B"]).await;
    fixture.cache.edit_value(fixture.key("A"), "kept").await;
    let temp_id = fixture
        .cache
        .add_child(fixture.key("Root"), "D")
        .await
        .applied()
        .unwrap();
    fixture.cache.delete_subtree(fixture.key("B")).await;

    let before_pending = fixture.cache.pending().await;
    let before_snapshot = fixture.cache.snapshot().await;
    fixture.store.shutdown().await;

    let err = fixture.cache.apply().await.unwrap_err();
    assert!(matches!(err, StorageError::Unavailable(_)));
    assert_eq!(fixture.cache.pending().await, before_pending);
    assert_eq!(fixture.cache.snapshot().await, before_snapshot);
    assert!(fixture.cache.node(NodeKey::from(temp_id)).await.is_some());

    let load = fixture.cache.load_element(fixture.id("C")).await;
    assert!(load.is_err());
}

#[tokio::test]
async fn clear_all_discards_everything() {
    let fixture = Fixture::new().await;
    fixture.load(&["A1-X", "A", "B"]).await;
    fixture.cache.edit_value(fixture.key("A"), "x").await;
    fixture.cache.add_child(fixture.key("B"), "y").await;
    fixture.cache.delete_subtree(fixture.key("A1-X")).await;

    fixture.cache.clear_all().await;
    assert!(fixture.cache.snapshot().await.is_empty());
    assert!(fixture.cache.pending().await.is_empty());
    assert!(fixture.cache.pending_batch().await.is_empty());

    // Orphan bookkeeping went too: loading A1 now links nothing.
    let a1 = fixture.cache.load_element(fixture.id("A1")).await.unwrap().unwrap();
    assert_eq!(a1.child_count(), 0);
}

#[tokio::test]
async fn snapshot_is_sorted_and_idempotent() {
    let fixture = Fixture::new().await;
    fixture.load(&["Root", "C", "B", "A", "C1", "A2", "A1"]).await;
    fixture.cache.edit_value(fixture.key("A"), "Zulu").await;
    fixture.cache.add_child(fixture.key("Root"), "Beta").await;

    let first = fixture.cache.snapshot().await;
    let second = fixture.cache.snapshot().await;
    assert_eq!(first, second);
    assert!(is_title_sorted(&first));
    assert_eq!(
        child_titles(&first[0]),
        vec!["B", "Beta", "C", "Zulu"]
    );
    let store_root = &fixture.store.full_snapshot().await.unwrap()[0];
    assert_eq!(child_titles(store_root), vec!["A", "B", "C"]);
    assert!(find_by_key(&first, fixture.key("A")).is_some());
}

#[tokio::test]
async fn deep_draft_chain_snapshots_before_and_after_apply() {
    const DEPTH: usize = 10_000;
    let fixture = Fixture::new().await;
    fixture.load(&["C1-X"]).await;

    let mut parent = fixture.key("C1-X");
    for level in 0..DEPTH {
        let temp_id = fixture
            .cache
            .add_child(parent, format!("deep-{}", level))
            .await
            .applied()
            .unwrap();
        parent = NodeKey::from(temp_id);
    }

    let snapshot = fixture.cache.snapshot().await;
    let (depth, last) = chain_depth(&snapshot[0]);
    assert_eq!(depth, DEPTH);
    assert_eq!(last.title, format!("deep-{}", DEPTH - 1));

    let result = fixture.cache.apply().await.unwrap();
    assert!(result.conflicts.is_empty());
    assert_eq!(result.created_id_map.len(), DEPTH);

    let snapshot = fixture.cache.snapshot().await;
    let (depth, last) = chain_depth(&snapshot[0]);
    assert_eq!(depth, DEPTH);
    assert!(last.id.permanent().is_some());

    let forest = fixture.store.full_snapshot().await.unwrap();
    let c1x = find_by_title(&fixture.seeded, "C1-X").unwrap().id;
    let stored = find_by_key(&forest, c1x).unwrap();
    assert_eq!(chain_depth(stored).0, DEPTH);
}
