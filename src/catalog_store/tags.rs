//! Tag registry: get-or-create, associations and orphan pruning.

use super::error::CatalogResult;
use super::models::{ItemId, Tag, TagId};
use super::store::{query_strings, SqliteCatalogStore};
use super::trait_def::TagRegistry;
use super::validation::validate_label;
use rusqlite::{params, Connection};
use tracing::{debug, info};

/// Get or create a tag in a single statement, so no other writer can slip in
/// between the existence check and the insert.
pub(super) fn upsert_tag(conn: &Connection, label: &str) -> rusqlite::Result<Tag> {
    let mut stmt = conn.prepare_cached(
        "INSERT INTO tags (label) VALUES (?1)
         ON CONFLICT(label) DO UPDATE SET label = excluded.label
         RETURNING id, label",
    )?;
    stmt.query_row(params![label], |row| {
        Ok(Tag {
            id: TagId(row.get(0)?),
            label: row.get(1)?,
        })
    })
}

/// Attach a tag to an item. Returns false if the pair already existed.
pub(super) fn link_item_tag(conn: &Connection, item_id: ItemId, tag_id: TagId) -> rusqlite::Result<bool> {
    let changed = conn.execute(
        "INSERT INTO item_tags (item_id, tag_id) VALUES (?1, ?2)
         ON CONFLICT(item_id, tag_id) DO NOTHING",
        params![item_id.0, tag_id.0],
    )?;
    Ok(changed > 0)
}

/// Delete every tag without items.
pub(super) fn prune_all_orphans(conn: &Connection) -> rusqlite::Result<usize> {
    conn.execute(
        "DELETE FROM tags
         WHERE NOT EXISTS (SELECT 1 FROM item_tags WHERE item_tags.tag_id = tags.id)",
        [],
    )
}

impl TagRegistry for SqliteCatalogStore {
    fn ensure_tag(&self, label: &str) -> CatalogResult<Tag> {
        validate_label(label)?;
        let conn = self.lock()?;
        let tag = upsert_tag(&conn, label.trim())?;
        debug!("Resolved tag '{}' to {:?}", tag.label, tag.id);
        Ok(tag)
    }

    fn prune_orphans(&self) -> CatalogResult<usize> {
        let conn = self.lock()?;
        let pruned = prune_all_orphans(&conn)?;
        if pruned > 0 {
            info!("Pruned {} orphan tags", pruned);
        }
        Ok(pruned)
    }

    fn list_labels(&self) -> CatalogResult<Vec<String>> {
        let conn = self.lock()?;
        query_strings(&conn, "SELECT label FROM tags ORDER BY label", [])
    }

    fn list_types(&self) -> CatalogResult<Vec<String>> {
        let conn = self.lock()?;
        query_strings(
            &conn,
            "SELECT DISTINCT item_type FROM items
             WHERE item_type IS NOT NULL
             ORDER BY item_type",
            [],
        )
    }
}
