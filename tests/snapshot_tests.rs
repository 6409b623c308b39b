//! Snapshot, rotation and restore of on-disk catalogs.

mod common;

use common::*;
use media_catalog::catalog_store::{
    CatalogError, CatalogStore, ItemCandidate, QueryEngine, SqliteCatalogStore, TagRegistry,
};
use std::fs;
use tempfile::TempDir;

#[test]
fn test_snapshot_is_a_readable_catalog() {
    let (dir, store) = open_test_catalog().unwrap();
    let backup_dir = dir.path().join("backups");

    let path = store.snapshot(&backup_dir).unwrap();
    let name = path.file_name().unwrap().to_str().unwrap().to_string();
    assert!(name.starts_with("catalog_"));
    assert!(name.ends_with(".db"));

    let copy = SqliteCatalogStore::open(&path).unwrap();
    assert_eq!(copy.list().unwrap(), store.list().unwrap());
    assert_eq!(copy.list_labels().unwrap(), store.list_labels().unwrap());
}

#[test]
fn test_restore_brings_back_snapshot_state() {
    let (dir, store) = open_test_catalog().unwrap();
    let before_items = store.list().unwrap();
    let before_labels = store.list_labels().unwrap();
    let snapshot = store.snapshot(dir.path().join("backups")).unwrap();

    let first = before_items[0].id;
    store.delete(first).unwrap();
    store
        .insert(
            &ItemCandidate::new("Aphex Twin", "Drukqs", "https://example.com/drukqs"),
            &labels(&["idm"]),
        )
        .unwrap();
    assert_ne!(store.list().unwrap(), before_items);

    store.restore(&snapshot).unwrap();
    assert_eq!(store.list().unwrap(), before_items);
    assert_eq!(store.list_labels().unwrap(), before_labels);

    // The restored catalog is the live one, it accepts writes and persists them
    store
        .insert(
            &ItemCandidate::new("Aphex Twin", "Drukqs", "https://example.com/drukqs"),
            &[],
        )
        .unwrap();
    let db_path = store.db_path().unwrap().to_path_buf();
    store.close().unwrap();

    let reopened = SqliteCatalogStore::open(&db_path).unwrap();
    assert_eq!(reopened.counts().unwrap().0, TEST_ITEM_COUNT + 1);
}

#[test]
fn test_restore_is_visible_to_clones() {
    let (dir, store) = open_test_catalog().unwrap();
    let other = store.clone();
    let snapshot = store.snapshot(dir.path().join("backups")).unwrap();

    for item in store.list().unwrap() {
        store.delete(item.id).unwrap();
    }
    assert!(other.list().unwrap().is_empty());

    store.restore(&snapshot).unwrap();
    assert_eq!(other.counts().unwrap(), (TEST_ITEM_COUNT, TEST_TAG_COUNT));
}

#[test]
fn test_restore_rejects_invalid_snapshot() {
    let (dir, store) = open_test_catalog().unwrap();
    let bogus = dir.path().join("catalog_20200101_000000.db");
    fs::write(&bogus, b"definitely not sqlite").unwrap();

    assert!(store.restore(&bogus).is_err());
    assert!(matches!(
        store.restore(dir.path().join("missing.db")),
        Err(CatalogError::Snapshot(_))
    ));

    // The live catalog is untouched
    assert_eq!(store.counts().unwrap(), (TEST_ITEM_COUNT, TEST_TAG_COUNT));
    assert_eq!(store.items_by_artist(ARTIST_2).unwrap().len(), 1);
}

#[test]
fn test_prune_snapshots_keeps_most_recent() {
    let (dir, store) = open_test_catalog().unwrap();
    let backup_dir = dir.path().join("backups");

    let mut last = None;
    for _ in 0..5 {
        last = Some(store.snapshot(&backup_dir).unwrap());
    }
    assert_eq!(
        SqliteCatalogStore::list_snapshots(&backup_dir, 100).unwrap().len(),
        5
    );

    assert_eq!(SqliteCatalogStore::prune_snapshots(&backup_dir, 3).unwrap(), 2);
    let remaining = SqliteCatalogStore::list_snapshots(&backup_dir, 100).unwrap();
    assert_eq!(remaining.len(), 3);
    assert_eq!(remaining.first(), last.as_ref());

    assert_eq!(SqliteCatalogStore::prune_snapshots(&backup_dir, 3).unwrap(), 0);
}

#[test]
fn test_list_snapshots_respects_limit() {
    let (dir, store) = open_test_catalog().unwrap();
    let backup_dir = dir.path().join("backups");
    store.snapshot(&backup_dir).unwrap();
    store.snapshot(&backup_dir).unwrap();

    assert_eq!(
        SqliteCatalogStore::list_snapshots(&backup_dir, 1).unwrap().len(),
        1
    );
    assert!(SqliteCatalogStore::list_snapshots(&backup_dir, 0)
        .unwrap()
        .is_empty());
}

#[test]
fn test_restore_into_fresh_location() {
    let (dir, store) = open_test_catalog().unwrap();
    let snapshot = store.snapshot(dir.path().join("backups")).unwrap();

    let other_dir = TempDir::new().unwrap();
    let empty = SqliteCatalogStore::open(other_dir.path().join("catalog.db")).unwrap();
    assert_eq!(empty.counts().unwrap(), (0, 0));

    empty.restore(&snapshot).unwrap();
    assert_eq!(empty.list().unwrap(), store.list().unwrap());
}
