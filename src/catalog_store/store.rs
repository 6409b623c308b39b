//! SQLite-backed catalog store.
//!
//! A single connection sits behind a mutex: every public operation holds the
//! lock for its whole duration and every write runs in one transaction, so
//! readers never observe a half-applied insert or delete.

use super::error::{CatalogError, CatalogResult};
use super::models::*;
use super::schema::CATALOG_SCHEMA;
use super::tags::{link_item_tag, prune_all_orphans, upsert_tag};
use super::trait_def::CatalogStore;
use super::validation::validate_candidate;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension, Params};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{debug, info, warn};

/// Columns selected for an `Item`, in the order `parse_item_row` expects.
pub(super) const ITEM_COLUMNS: &str = "items.id, items.artist, items.name, items.release_date, \
     items.release_year, items.source_url, items.item_type";

/// SQLite-backed catalog store. Clones share the same connection.
#[derive(Clone)]
pub struct SqliteCatalogStore {
    conn: Arc<Mutex<Connection>>,
    db_path: Option<PathBuf>,
}

impl SqliteCatalogStore {
    /// Open the catalog database at `db_path`, creating it if needed.
    ///
    /// The schema of an existing database is validated, and unless the
    /// `no_checks` feature is enabled its integrity is verified as well.
    pub fn open<P: AsRef<Path>>(db_path: P) -> CatalogResult<Self> {
        let db_path = db_path.as_ref();
        let conn = open_connection(db_path)?;

        let store = SqliteCatalogStore {
            conn: Arc::new(Mutex::new(conn)),
            db_path: Some(db_path.to_path_buf()),
        };

        let (item_count, tag_count) = store.counts()?;
        info!(
            "Opened catalog at {:?}: {} items, {} tags",
            db_path, item_count, tag_count
        );
        Ok(store)
    }

    /// Create an in-memory catalog. Nothing is persisted.
    pub fn in_memory() -> CatalogResult<Self> {
        let conn = prepare_connection(Connection::open_in_memory()?)?;
        Ok(SqliteCatalogStore {
            conn: Arc::new(Mutex::new(conn)),
            db_path: None,
        })
    }

    /// Path of the database file, `None` for in-memory catalogs.
    pub fn db_path(&self) -> Option<&Path> {
        self.db_path.as_deref()
    }

    /// Close the connection, reporting errors that dropping would swallow.
    ///
    /// If other clones of this store are still alive the connection stays open
    /// until the last one is dropped.
    pub fn close(self) -> CatalogResult<()> {
        match Arc::try_unwrap(self.conn) {
            Ok(mutex) => {
                let conn = mutex.into_inner().map_err(|_| CatalogError::LockPoisoned)?;
                conn.close().map_err(|(_, e)| CatalogError::from(e))?;
                debug!("Closed catalog at {:?}", self.db_path);
                Ok(())
            }
            Err(_) => {
                debug!("Catalog still shared, leaving connection open");
                Ok(())
            }
        }
    }

    /// Number of items and tags.
    pub fn counts(&self) -> CatalogResult<(usize, usize)> {
        let conn = self.lock()?;
        let items: i64 = conn.query_row("SELECT COUNT(*) FROM items", [], |r| r.get(0))?;
        let tags: i64 = conn.query_row("SELECT COUNT(*) FROM tags", [], |r| r.get(0))?;
        Ok((items as usize, tags as usize))
    }

    pub(super) fn lock(&self) -> CatalogResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| CatalogError::LockPoisoned)
    }

    /// Insert implementation. `after_item_written` runs inside the transaction
    /// right after the item row is written and before any tag is attached;
    /// an error from it rolls the whole insert back.
    fn insert_inner<F>(
        &self,
        candidate: &ItemCandidate,
        tag_labels: &[String],
        after_item_written: F,
    ) -> CatalogResult<InsertOutcome>
    where
        F: FnOnce(&Connection, ItemId) -> CatalogResult<()>,
    {
        validate_candidate(candidate)?;
        let labels = normalize_labels(tag_labels);
        let source_url = candidate.source_url.trim();

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if let Some(existing) = find_item_by_source_url(&tx, source_url)? {
            debug!("Item {} already cataloged from {}", existing, source_url);
            return Ok(InsertOutcome::AlreadyExists(existing));
        }

        tx.execute(
            "INSERT INTO items (artist, name, release_date, release_year, source_url, item_type)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                candidate.artist.trim(),
                candidate.name.trim(),
                non_empty(candidate.release_date.as_deref()),
                candidate.effective_release_year(),
                source_url,
                non_empty(candidate.item_type.as_deref()),
            ],
        )?;
        let item_id = ItemId(tx.last_insert_rowid());

        after_item_written(&*tx, item_id)?;

        for label in &labels {
            let tag = upsert_tag(&tx, label)?;
            link_item_tag(&tx, item_id, tag.id)?;
        }

        tx.commit()?;
        info!(
            "Inserted item {} '{}' by '{}' with {} tags",
            item_id,
            candidate.name.trim(),
            candidate.artist.trim(),
            labels.len()
        );
        Ok(InsertOutcome::Inserted(item_id))
    }
}

// =========================================================================
// Connection setup
// =========================================================================

pub(super) fn open_connection(db_path: &Path) -> CatalogResult<Connection> {
    let conn = Connection::open_with_flags(
        db_path,
        OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_URI
            | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )?;
    let journal_mode: String =
        conn.pragma_update_and_check(None, "journal_mode", "WAL", |r| r.get(0))?;
    if !journal_mode.eq_ignore_ascii_case("wal") {
        warn!(
            "Catalog at {:?} runs in {} journal mode instead of WAL",
            db_path, journal_mode
        );
    }
    conn.pragma_update(None, "synchronous", "FULL")?;
    prepare_connection(conn)
}

fn prepare_connection(conn: Connection) -> CatalogResult<Connection> {
    conn.pragma_update(None, "foreign_keys", "ON")?;
    CATALOG_SCHEMA
        .prepare(&conn)
        .map_err(|e| CatalogError::Schema(format!("{:#}", e)))?;

    #[cfg(not(feature = "no_checks"))]
    verify_catalog(&conn)?;

    Ok(conn)
}

/// Check the database file and the association invariants. Tags left without
/// items by an interrupted writer are pruned.
#[cfg(not(feature = "no_checks"))]
fn verify_catalog(conn: &Connection) -> CatalogResult<()> {
    let quick_check: String = conn.query_row("PRAGMA quick_check", [], |r| r.get(0))?;
    if quick_check != "ok" {
        return Err(CatalogError::Integrity(quick_check));
    }

    let dangling: i64 = conn.query_row(
        "SELECT COUNT(*) FROM item_tags
         WHERE NOT EXISTS (SELECT 1 FROM items WHERE items.id = item_tags.item_id)
            OR NOT EXISTS (SELECT 1 FROM tags WHERE tags.id = item_tags.tag_id)",
        [],
        |r| r.get(0),
    )?;
    if dangling > 0 {
        return Err(CatalogError::Integrity(format!(
            "{} associations reference missing items or tags",
            dangling
        )));
    }

    let pruned = prune_all_orphans(conn)?;
    if pruned > 0 {
        warn!("Pruned {} tags without items", pruned);
    }
    Ok(())
}

// =========================================================================
// Row helpers
// =========================================================================

pub(super) fn parse_item_row(row: &rusqlite::Row) -> rusqlite::Result<Item> {
    Ok(Item {
        id: ItemId(row.get(0)?),
        artist: row.get(1)?,
        name: row.get(2)?,
        release_date: row.get(3)?,
        release_year: row.get(4)?,
        source_url: row.get(5)?,
        item_type: row.get(6)?,
    })
}

pub(super) fn query_items<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> CatalogResult<Vec<Item>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let items = stmt
        .query_map(params, parse_item_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(items)
}

pub(super) fn query_strings<P: Params>(
    conn: &Connection,
    sql: &str,
    params: P,
) -> CatalogResult<Vec<String>> {
    let mut stmt = conn.prepare_cached(sql)?;
    let values = stmt
        .query_map(params, |r| r.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(values)
}

fn find_item_by_source_url(conn: &Connection, source_url: &str) -> CatalogResult<Option<ItemId>> {
    let id = conn
        .query_row(
            "SELECT id FROM items WHERE source_url = ?1",
            params![source_url],
            |r| r.get(0),
        )
        .optional()?;
    Ok(id.map(ItemId))
}

fn item_exists(conn: &Connection, id: ItemId) -> CatalogResult<bool> {
    let found = conn
        .query_row("SELECT 1 FROM items WHERE id = ?1", params![id.0], |_| Ok(()))
        .optional()?;
    Ok(found.is_some())
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}

// =========================================================================
// CatalogStore
// =========================================================================

impl CatalogStore for SqliteCatalogStore {
    fn insert(
        &self,
        candidate: &ItemCandidate,
        tag_labels: &[String],
    ) -> CatalogResult<InsertOutcome> {
        self.insert_inner(candidate, tag_labels, |_, _| Ok(()))
    }

    fn delete(&self, id: ItemId) -> CatalogResult<DeleteOutcome> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        if !item_exists(&tx, id)? {
            debug!("Item {} not found, nothing to delete", id);
            return Ok(DeleteOutcome::NotFound);
        }

        tx.execute("DELETE FROM item_tags WHERE item_id = ?1", params![id.0])?;
        tx.execute("DELETE FROM items WHERE id = ?1", params![id.0])?;
        // Full sweep: tags created through ensure_tag may have never had an item
        let pruned = prune_all_orphans(&tx)?;

        tx.commit()?;
        info!("Deleted item {}, pruned {} orphan tags", id, pruned);
        Ok(DeleteOutcome::Deleted)
    }

    fn list(&self) -> CatalogResult<Vec<Item>> {
        let conn = self.lock()?;
        query_items(
            &conn,
            &format!(
                "SELECT {} FROM items ORDER BY items.artist, items.id",
                ITEM_COLUMNS
            ),
            [],
        )
    }

    fn get(&self, id: ItemId) -> CatalogResult<Option<Item>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare_cached(&format!(
            "SELECT {} FROM items WHERE items.id = ?1",
            ITEM_COLUMNS
        ))?;
        let item = stmt.query_row(params![id.0], parse_item_row).optional()?;
        Ok(item)
    }

    fn tags_for_item(&self, id: ItemId) -> CatalogResult<Vec<String>> {
        let conn = self.lock()?;
        query_strings(
            &conn,
            "SELECT tags.label FROM tags
             JOIN item_tags ON item_tags.tag_id = tags.id
             WHERE item_tags.item_id = ?1
             ORDER BY tags.label",
            params![id.0],
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog_store::{TagRegistry, ValidationError};

    fn labels(values: &[&str]) -> Vec<String> {
        values.iter().map(|s| s.to_string()).collect()
    }

    fn candidate(artist: &str, name: &str, url: &str) -> ItemCandidate {
        ItemCandidate::new(artist, name, url)
    }

    fn association_count(store: &SqliteCatalogStore) -> i64 {
        let conn = store.lock().unwrap();
        conn.query_row("SELECT COUNT(*) FROM item_tags", [], |r| r.get(0))
            .unwrap()
    }

    #[test]
    fn test_insert_and_get() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let outcome = store
            .insert(
                &candidate("Radiohead", "OK Computer", "https://example.com/a/1")
                    .with_release_date("1997-05-21")
                    .with_item_type("album"),
                &labels(&["rock", "90s"]),
            )
            .unwrap();
        assert!(outcome.is_inserted());

        let item = store.get(outcome.item_id()).unwrap().unwrap();
        assert_eq!(item.artist, "Radiohead");
        assert_eq!(item.name, "OK Computer");
        assert_eq!(item.release_date.as_deref(), Some("1997-05-21"));
        assert_eq!(item.release_year, Some(1997));
        assert_eq!(item.item_type.as_deref(), Some("album"));
        assert_eq!(
            store.tags_for_item(item.id).unwrap(),
            labels(&["90s", "rock"])
        );
    }

    #[test]
    fn test_duplicate_source_url_is_already_exists() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let first = store
            .insert(&candidate("A", "X", "url-1"), &labels(&["rock"]))
            .unwrap();
        let second = store
            .insert(&candidate("B", "Y", "url-1"), &labels(&["jazz"]))
            .unwrap();

        assert_eq!(second, InsertOutcome::AlreadyExists(first.item_id()));
        let items = store.list().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].artist, "A");
        // The rejected call must not have created its tags either
        assert_eq!(store.list_labels().unwrap(), labels(&["rock"]));
    }

    #[test]
    fn test_source_url_is_trimmed_before_dedup() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        store.insert(&candidate("A", "X", "url-1"), &[]).unwrap();
        let outcome = store.insert(&candidate("A", "X", "  url-1 "), &[]).unwrap();
        assert!(matches!(outcome, InsertOutcome::AlreadyExists(_)));
    }

    #[test]
    fn test_validation_rejects_before_mutation() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let result = store.insert(&candidate("A", "X", "  "), &labels(&["rock"]));
        assert!(matches!(
            result,
            Err(CatalogError::Validation(ValidationError::EmptyField {
                field: "source_url"
            }))
        ));

        let result = store.insert(&candidate("", "X", "url"), &labels(&["rock"]));
        assert!(matches!(
            result,
            Err(CatalogError::Validation(ValidationError::EmptyField { field: "artist" }))
        ));

        assert!(store.list().unwrap().is_empty());
        assert!(store.list_labels().unwrap().is_empty());
    }

    #[test]
    fn test_duplicate_labels_collapse_to_one_association() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let outcome = store
            .insert(
                &candidate("A", "X", "url-1"),
                &labels(&["rock", "rock", " rock ", ""]),
            )
            .unwrap();

        assert_eq!(association_count(&store), 1);
        assert_eq!(
            store.tags_for_item(outcome.item_id()).unwrap(),
            labels(&["rock"])
        );
    }

    #[test]
    fn test_labels_are_case_sensitive() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        store
            .insert(&candidate("A", "X", "url-1"), &labels(&["Rock", "rock"]))
            .unwrap();
        assert_eq!(store.list_labels().unwrap(), labels(&["Rock", "rock"]));
    }

    #[test]
    fn test_shared_tags_are_reused() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        store
            .insert(&candidate("A", "X", "url-1"), &labels(&["rock"]))
            .unwrap();
        store
            .insert(&candidate("B", "Y", "url-2"), &labels(&["rock"]))
            .unwrap();

        let (items, tags) = store.counts().unwrap();
        assert_eq!((items, tags), (2, 1));
        assert_eq!(association_count(&store), 2);
    }

    #[test]
    fn test_delete_cascades_and_prunes_orphans() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let a = store
            .insert(&candidate("A", "X", "url-a"), &labels(&["rock", "90s"]))
            .unwrap()
            .item_id();
        store
            .insert(&candidate("B", "Y", "url-b"), &labels(&["rock"]))
            .unwrap();

        assert_eq!(store.delete(a).unwrap(), DeleteOutcome::Deleted);

        assert_eq!(store.list_labels().unwrap(), labels(&["rock"]));
        assert_eq!(association_count(&store), 1);
        assert!(store.get(a).unwrap().is_none());
        assert!(store.tags_for_item(a).unwrap().is_empty());
    }

    #[test]
    fn test_delete_sweeps_unused_tags_from_ensure_tag() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let id = store
            .insert(&candidate("A", "X", "url-a"), &labels(&["rock"]))
            .unwrap()
            .item_id();
        store.ensure_tag("lonely").unwrap();

        assert_eq!(store.delete(id).unwrap(), DeleteOutcome::Deleted);
        assert!(store.list_labels().unwrap().is_empty());
        assert_eq!(store.counts().unwrap(), (0, 0));
    }

    #[test]
    fn test_delete_is_idempotent() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let id = store
            .insert(&candidate("A", "X", "url-a"), &labels(&["rock"]))
            .unwrap()
            .item_id();
        store
            .insert(&candidate("B", "Y", "url-b"), &labels(&["jazz"]))
            .unwrap();

        assert_eq!(store.delete(id).unwrap(), DeleteOutcome::Deleted);
        let after_first = store.list().unwrap();
        let labels_after_first = store.list_labels().unwrap();

        assert_eq!(store.delete(id).unwrap(), DeleteOutcome::NotFound);
        assert_eq!(store.delete(ItemId(999)).unwrap(), DeleteOutcome::NotFound);
        assert_eq!(store.list().unwrap(), after_first);
        assert_eq!(store.list_labels().unwrap(), labels_after_first);
    }

    #[test]
    fn test_item_ids_are_never_reused() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let first = store
            .insert(&candidate("A", "X", "url-a"), &[])
            .unwrap()
            .item_id();
        store.delete(first).unwrap();
        let second = store
            .insert(&candidate("A", "X", "url-a"), &[])
            .unwrap()
            .item_id();
        assert!(second > first);
    }

    #[test]
    fn test_list_sorts_by_artist_then_insertion() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        store
            .insert(&candidate("B", "b", "url-1").with_release_date("2020"), &[])
            .unwrap();
        store
            .insert(&candidate("A", "a-2019", "url-2").with_release_date("2019"), &[])
            .unwrap();
        store
            .insert(&candidate("A", "a-2021", "url-3").with_release_date("2021"), &[])
            .unwrap();

        let names: Vec<String> = store.list().unwrap().into_iter().map(|i| i.name).collect();
        assert_eq!(names, labels(&["a-2019", "a-2021", "b"]));
    }

    #[test]
    fn test_empty_optional_fields_are_stored_as_null() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let mut c = candidate(" A ", " X ", "url-1");
        c.release_date = Some("".to_string());
        c.item_type = Some("  ".to_string());
        let id = store.insert(&c, &[]).unwrap().item_id();

        let item = store.get(id).unwrap().unwrap();
        assert_eq!(item.artist, "A");
        assert_eq!(item.name, "X");
        assert_eq!(item.release_date, None);
        assert_eq!(item.release_year, None);
        assert_eq!(item.item_type, None);
    }

    #[test]
    fn test_failure_after_item_row_rolls_back_everything() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        store
            .insert(&candidate("B", "Y", "url-b"), &labels(&["rock"]))
            .unwrap();

        let result = store.insert_inner(
            &candidate("A", "X", "url-a"),
            &labels(&["rock", "90s"]),
            |conn, id| {
                let written: i64 = conn.query_row(
                    "SELECT COUNT(*) FROM items WHERE id = ?1",
                    params![id.0],
                    |r| r.get(0),
                )?;
                assert_eq!(written, 1);
                Err(CatalogError::Integrity("injected fault".to_string()))
            },
        );
        assert!(matches!(result, Err(CatalogError::Integrity(_))));

        let items = store.list().unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].source_url, "url-b");
        assert_eq!(store.list_labels().unwrap(), labels(&["rock"]));
        assert_eq!(association_count(&store), 1);

        // The same source can be ingested once the fault is gone
        let outcome = store
            .insert(&candidate("A", "X", "url-a"), &labels(&["90s"]))
            .unwrap();
        assert!(outcome.is_inserted());
    }

    #[test]
    fn test_clones_share_state() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let other = store.clone();
        store.insert(&candidate("A", "X", "url-a"), &[]).unwrap();
        assert_eq!(other.list().unwrap().len(), 1);
    }

    #[test]
    fn test_close_in_memory() {
        let store = SqliteCatalogStore::in_memory().unwrap();
        let other = store.clone();
        store.close().unwrap();
        assert!(other.list().unwrap().is_empty());
        other.close().unwrap();
    }
}
