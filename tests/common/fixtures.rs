//! Test fixture creation for on-disk catalogs

use super::constants::*;
use anyhow::Result;
use media_catalog::catalog_store::{CatalogStore, ItemCandidate, SqliteCatalogStore};
use std::path::PathBuf;
use tempfile::TempDir;

pub fn labels(values: &[&str]) -> Vec<String> {
    values.iter().map(|s| s.to_string()).collect()
}

/// Creates a catalog file with 2 artists, 3 items and 3 tags, then closes it.
/// Returns (temp_dir, catalog_db_path)
pub fn create_test_catalog() -> Result<(TempDir, PathBuf)> {
    let dir = TempDir::new()?;
    let db_path = dir.path().join("catalog.db");

    let store = SqliteCatalogStore::open(&db_path)?;
    store.insert(
        &ItemCandidate::new(ARTIST_1, "Music Has the Right to Children", ITEM_1_URL)
            .with_release_date("1998-04-20")
            .with_item_type("album"),
        &labels(&[TAG_ELECTRONIC, TAG_90S]),
    )?;
    store.insert(
        &ItemCandidate::new(ARTIST_1, "Geogaddi", ITEM_2_URL)
            .with_release_date("2002-02-18")
            .with_item_type("album"),
        &labels(&[TAG_ELECTRONIC]),
    )?;
    store.insert(
        &ItemCandidate::new(ARTIST_2, "Dots and Loops", ITEM_3_URL)
            .with_release_date("1997-09-22")
            .with_item_type("album"),
        &labels(&[TAG_POP, TAG_90S]),
    )?;
    store.close()?;

    Ok((dir, db_path))
}

/// Creates the fixture catalog and opens it.
pub fn open_test_catalog() -> Result<(TempDir, SqliteCatalogStore)> {
    let (dir, db_path) = create_test_catalog()?;
    let store = SqliteCatalogStore::open(&db_path)?;
    Ok((dir, store))
}
