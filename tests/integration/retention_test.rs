//! Retention Integration Tests
//!
//! The per-conversation file bound, eviction order and the on-disk cleanup
//! that goes with it.

use analyst_gateway::services::tabular::{ConversationTableStore, DEFAULT_MAX_FILES};

use crate::common::{dir_entries, staged_csv, staged_workbook};

fn store_in(dir: &std::path::Path) -> ConversationTableStore {
    ConversationTableStore::new(dir, DEFAULT_MAX_FILES)
}

#[tokio::test]
async fn test_bound_holds_and_oldest_is_evicted_first() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(temp.path());

    let mut evicted = Vec::new();
    for name in ["a.csv", "b.csv", "c.csv", "d.csv", "e.csv"] {
        let record = staged_csv(temp.path(), name, "x,y\n1,2\n");
        let outcome = store.add_file("t", record).await;
        assert!(outcome.is_loaded());
        assert!(store.file_names("t").await.len() <= DEFAULT_MAX_FILES);
        evicted.extend(outcome.evicted);
    }

    assert_eq!(evicted, vec!["a.csv", "b.csv"]);
    assert_eq!(store.file_names("t").await, vec!["c.csv", "d.csv", "e.csv"]);
    assert_eq!(store.table_keys("t").await, vec!["c.csv", "d.csv", "e.csv"]);
}

#[tokio::test]
async fn test_eviction_deletes_tracked_file_and_scratch_copy() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(temp.path());

    let first = staged_csv(temp.path(), "first.csv", "x,y\n1,2\n");
    store.add_file("t", first.clone()).await;
    let first_copy = store.files("t").await[0].path.clone();
    assert!(first_copy.exists());

    for name in ["b.csv", "c.csv", "d.csv"] {
        store.add_file("t", staged_csv(temp.path(), name, "x,y\n1,2\n")).await;
    }

    assert!(!first.path.exists());
    assert!(!first_copy.exists());
    assert!(!dir_entries(temp.path()).iter().any(|n| n.contains("first")));
}

#[tokio::test]
async fn test_evicting_workbook_drops_every_sheet_table() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(temp.path());

    let book = staged_workbook(
        temp.path(),
        "book.xlsx",
        &[
            ("Q1", vec![vec!["k", "v"], vec!["a", "1"]]),
            ("Q2", vec![vec!["k", "v"], vec!["b", "2"]]),
        ],
    );
    store.add_file("t", book).await;
    assert_eq!(
        store.table_keys("t").await,
        vec!["book.xlsx [Sheet: Q1]", "book.xlsx [Sheet: Q2]"]
    );

    store.add_file("t", staged_csv(temp.path(), "b.csv", "x,y\n1,2\n")).await;
    store.add_file("t", staged_csv(temp.path(), "c.csv", "x,y\n1,2\n")).await;
    let outcome = store.add_file("t", staged_csv(temp.path(), "d.csv", "x,y\n1,2\n")).await;

    assert_eq!(outcome.evicted, vec!["book.xlsx"]);
    let keys = store.table_keys("t").await;
    assert!(keys.iter().all(|k| !k.starts_with("book.xlsx")));
    assert_eq!(keys.len(), 3);
}

#[tokio::test]
async fn test_re_adding_same_file_is_a_no_op() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(temp.path());
    let record = staged_csv(temp.path(), "a.csv", "x,y\n1,2\n3,4\n");

    store.add_file("t", record.clone()).await;
    let before = dir_entries(temp.path());

    let outcome = store.add_file("t", record).await;

    assert!(outcome.error.is_none());
    assert!(outcome.evicted.is_empty());
    assert_eq!(outcome.tables.unwrap()[0].1.row_count(), 2);
    assert_eq!(store.file_names("t").await, vec!["a.csv"]);
    assert_eq!(dir_entries(temp.path()), before);
}

#[tokio::test]
async fn test_re_adding_from_moved_declared_path_resolves_to_tracked_file() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(temp.path());
    let record = staged_csv(temp.path(), "a.csv", "x,y\n1,2\n");

    store.add_file("t", record.clone()).await;
    let before = dir_entries(temp.path());

    let moved = record.with_path(&temp.path().join("moved/a.csv"));
    let outcome = store.add_file("t", moved).await;

    assert!(outcome.error.is_none());
    assert!(outcome.evicted.is_empty());
    assert_eq!(outcome.tables.unwrap()[0].1.row_count(), 1);
    assert_eq!(dir_entries(temp.path()), before);
    assert!(record.path.exists());
}

#[tokio::test]
async fn test_same_name_from_new_path_supersedes_without_eviction() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(temp.path());

    for name in ["a.csv", "b.csv", "c.csv"] {
        store.add_file("t", staged_csv(temp.path(), name, "x,y\n1,2\n")).await;
    }
    let old_a = store.files("t").await[0].clone();
    let old_tracked = temp.path().join("pandas_agent_1700000000_a.csv");

    let new_path = temp.path().join("pandas_agent_1700000099_a.csv");
    std::fs::write(&new_path, "x,y\n1,2\n3,4\n5,6\n").unwrap();
    let replacement = analyst_gateway::models::FileRecord::new(
        "a.csv",
        &new_path,
        analyst_gateway::models::FileKind::DelimitedText,
    );
    let outcome = store.add_file("t", replacement).await;

    assert!(outcome.evicted.is_empty());
    assert_eq!(outcome.tables.unwrap()[0].1.row_count(), 3);

    // Replaced file moves to the newest position
    assert_eq!(store.file_names("t").await, vec!["b.csv", "c.csv", "a.csv"]);
    assert!(!old_tracked.exists());
    assert!(new_path.exists());
    assert_eq!(old_a.name, "a.csv");

    let session = store.session("t");
    let session = session.lock().await;
    assert_eq!(session.tables()["a.csv"].row_count(), 3);
    assert_eq!(session.tracked_path("a.csv"), Some(&new_path));
}

#[tokio::test]
async fn test_stale_tables_served_when_file_disappears() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(temp.path());
    let record = staged_csv(temp.path(), "a.csv", "x,y\n1,2\n");
    store.add_file("t", record.clone()).await;

    // Remove every copy so the locator has nothing to find
    for entry in std::fs::read_dir(temp.path()).unwrap().flatten() {
        std::fs::remove_file(entry.path()).unwrap();
    }

    let outcome = store.add_file("t", record).await;

    assert!(outcome.error.is_none());
    assert_eq!(outcome.tables.unwrap()[0].0, "a.csv");
    assert_eq!(store.file_names("t").await, vec!["a.csv"]);
}

#[tokio::test]
async fn test_conversations_are_isolated() {
    let temp = tempfile::tempdir().unwrap();
    let store = store_in(temp.path());

    store.add_file("t1", staged_csv(temp.path(), "one.csv", "x,y\n1,2\n")).await;
    store.add_file("t2", staged_csv(temp.path(), "two.csv", "x,y\n1,2\n")).await;

    assert_eq!(store.file_names("t1").await, vec!["one.csv"]);
    assert_eq!(store.file_names("t2").await, vec!["two.csv"]);

    assert!(store.remove_conversation("t1").await);
    assert!(!store.has_session("t1"));
    assert_eq!(store.file_names("t2").await, vec!["two.csv"]);
}
