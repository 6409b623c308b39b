//! Media Catalog Library
//!
//! A personal catalog of media items (albums, tracks, ...) with free-form tags,
//! persisted in a single SQLite file.

pub mod catalog_store;
pub mod config;
pub mod ingest;
pub mod sqlite_persistence;

// Re-export commonly used types for convenience
pub use catalog_store::{
    CatalogError, CatalogStore, QueryEngine, SqliteCatalogStore, TagRegistry,
};
pub use ingest::{ingest, IngestError, MetadataResolver, ResolutionError, ResolvedMetadata};
