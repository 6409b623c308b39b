//! Catalog trait definitions.
//!
//! The catalog is one store with three responsibilities: item lifecycle,
//! tag bookkeeping and read-only queries. `SqliteCatalogStore` implements
//! all three over a single connection.

use super::error::CatalogResult;
use super::models::{DeleteOutcome, InsertOutcome, Item, ItemCandidate, ItemId, Tag};

/// Item lifecycle: insert with dedup, delete with cascade, listing.
pub trait CatalogStore: Send + Sync {
    /// Insert a new item and attach the given tags to it.
    ///
    /// Labels are trimmed, empty ones are ignored and duplicates collapse to a
    /// single association. If an item with the same source URL exists the call
    /// changes nothing and returns `InsertOutcome::AlreadyExists`.
    fn insert(&self, candidate: &ItemCandidate, tag_labels: &[String])
        -> CatalogResult<InsertOutcome>;

    /// Delete an item, its associations, and the tags left without items.
    /// Deleting a missing item returns `DeleteOutcome::NotFound`.
    fn delete(&self, id: ItemId) -> CatalogResult<DeleteOutcome>;

    /// All items sorted by artist, ties in insertion order.
    fn list(&self) -> CatalogResult<Vec<Item>>;

    /// Get an item by ID.
    fn get(&self, id: ItemId) -> CatalogResult<Option<Item>>;

    /// Labels attached to an item, ascending.
    fn tags_for_item(&self, id: ItemId) -> CatalogResult<Vec<String>>;
}

/// Tag bookkeeping.
pub trait TagRegistry: Send + Sync {
    /// Get or create the tag with the given label.
    fn ensure_tag(&self, label: &str) -> CatalogResult<Tag>;

    /// Remove every tag that no item references. Returns how many were removed.
    fn prune_orphans(&self) -> CatalogResult<usize>;

    /// All tag labels, ascending.
    fn list_labels(&self) -> CatalogResult<Vec<String>>;

    /// Distinct item types across the catalog, ascending.
    fn list_types(&self) -> CatalogResult<Vec<String>>;
}

/// Read-only views over items and their tags.
///
/// A lookup without matches returns an empty vector.
pub trait QueryEngine: Send + Sync {
    /// Distinct artists, ascending.
    fn list_artists(&self) -> CatalogResult<Vec<String>>;

    /// Items of an artist, most recent release first. Items without a release
    /// date come last.
    fn items_by_artist(&self, artist: &str) -> CatalogResult<Vec<Item>>;

    /// Items carrying a tag, by artist and then most recent release first.
    fn items_by_tag(&self, label: &str) -> CatalogResult<Vec<Item>>;

    /// Distinct artists of the items carrying a tag, ascending.
    fn artists_by_tag(&self, label: &str) -> CatalogResult<Vec<String>>;

    /// Items of the given type. No ordering guarantee.
    fn items_by_type(&self, item_type: &str) -> CatalogResult<Vec<Item>>;

    /// Distinct types among the items of an artist, ascending.
    fn types_by_artist(&self, artist: &str) -> CatalogResult<Vec<String>>;
}
