//! Read-only catalog lookups.
//!
//! Release dates are free-form text, "most recent first" is their descending
//! text order, which is chronological for ISO-8601 style dates. Items without
//! a release date always sort last.

use super::error::CatalogResult;
use super::models::Item;
use super::store::{query_items, query_strings, SqliteCatalogStore, ITEM_COLUMNS};
use super::trait_def::QueryEngine;
use rusqlite::params;

impl QueryEngine for SqliteCatalogStore {
    fn list_artists(&self) -> CatalogResult<Vec<String>> {
        let conn = self.lock()?;
        query_strings(
            &conn,
            "SELECT DISTINCT artist FROM items ORDER BY artist",
            [],
        )
    }

    fn items_by_artist(&self, artist: &str) -> CatalogResult<Vec<Item>> {
        let conn = self.lock()?;
        query_items(
            &conn,
            &format!(
                "SELECT {} FROM items
                 WHERE items.artist = ?1
                 ORDER BY items.release_date IS NULL, items.release_date DESC, items.id",
                ITEM_COLUMNS
            ),
            params![artist],
        )
    }

    fn items_by_tag(&self, label: &str) -> CatalogResult<Vec<Item>> {
        let conn = self.lock()?;
        query_items(
            &conn,
            &format!(
                "SELECT {} FROM items
                 JOIN item_tags ON item_tags.item_id = items.id
                 JOIN tags ON tags.id = item_tags.tag_id
                 WHERE tags.label = ?1
                 ORDER BY items.artist, items.release_date IS NULL, items.release_date DESC, items.id",
                ITEM_COLUMNS
            ),
            params![label],
        )
    }

    fn artists_by_tag(&self, label: &str) -> CatalogResult<Vec<String>> {
        let conn = self.lock()?;
        query_strings(
            &conn,
            "SELECT DISTINCT items.artist FROM items
             JOIN item_tags ON item_tags.item_id = items.id
             JOIN tags ON tags.id = item_tags.tag_id
             WHERE tags.label = ?1
             ORDER BY items.artist",
            params![label],
        )
    }

    fn items_by_type(&self, item_type: &str) -> CatalogResult<Vec<Item>> {
        let conn = self.lock()?;
        query_items(
            &conn,
            &format!(
                "SELECT {} FROM items WHERE items.item_type = ?1 ORDER BY items.id",
                ITEM_COLUMNS
            ),
            params![item_type],
        )
    }

    fn types_by_artist(&self, artist: &str) -> CatalogResult<Vec<String>> {
        let conn = self.lock()?;
        query_strings(
            &conn,
            "SELECT DISTINCT item_type FROM items
             WHERE artist = ?1 AND item_type IS NOT NULL
             ORDER BY item_type",
            params![artist],
        )
    }
}
