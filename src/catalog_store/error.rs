use super::validation::ValidationError;
use thiserror::Error;

/// Faults raised by the catalog store.
///
/// Expected conditions (duplicate insert, delete of a missing item, query
/// with no match) are not errors, see `InsertOutcome` and `DeleteOutcome`.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Invalid item: {0}")]
    Validation(#[from] ValidationError),

    #[error("Storage error: {0}")]
    Storage(#[from] rusqlite::Error),

    #[error("Catalog schema mismatch: {0}")]
    Schema(String),

    #[error("Catalog integrity check failed: {0}")]
    Integrity(String),

    #[error("Catalog connection lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Snapshot error: {0}")]
    Snapshot(String),
}

pub type CatalogResult<T> = Result<T, CatalogError>;
