//! Ingestion of items from an external metadata provider.
//!
//! A `MetadataResolver` turns a user supplied source (usually a provider URL)
//! into item fields, which are then inserted into the catalog together with
//! the user's tags. Resolution failures are reported as they are, nothing is
//! retried.

use crate::catalog_store::{CatalogError, CatalogStore, InsertOutcome, ItemCandidate};
use thiserror::Error;
use tracing::{info, warn};

/// Item fields as returned by a metadata provider.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ResolvedMetadata {
    pub artist: String,
    pub name: String,
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    /// Canonical URL of the resolved resource, used to detect duplicates
    pub source_url: String,
    pub item_type: Option<String>,
}

impl From<ResolvedMetadata> for ItemCandidate {
    fn from(metadata: ResolvedMetadata) -> Self {
        let candidate = ItemCandidate {
            artist: metadata.artist,
            name: metadata.name,
            release_date: metadata.release_date,
            release_year: metadata.release_year,
            source_url: metadata.source_url,
            item_type: metadata.item_type,
        };
        let release_year = candidate.effective_release_year();
        ItemCandidate {
            release_year,
            ..candidate
        }
    }
}

#[derive(Debug, Error)]
pub enum ResolutionError {
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    #[error("Metadata provider failed: {0}")]
    Provider(String),
}

/// Looks up item metadata for a source.
pub trait MetadataResolver: Send + Sync {
    fn resolve(&self, source: &str) -> Result<ResolvedMetadata, ResolutionError>;
}

#[derive(Debug, Error)]
pub enum IngestError {
    #[error(transparent)]
    Resolution(#[from] ResolutionError),

    #[error(transparent)]
    Catalog(#[from] CatalogError),
}

/// Resolve `source` and insert the resulting item with `tags`.
pub fn ingest<R, S>(
    resolver: &R,
    store: &S,
    source: &str,
    tags: &[String],
) -> Result<InsertOutcome, IngestError>
where
    R: MetadataResolver + ?Sized,
    S: CatalogStore + ?Sized,
{
    let metadata = resolver.resolve(source).map_err(|e| {
        warn!("Could not resolve {}: {}", source, e);
        e
    })?;
    let candidate = ItemCandidate::from(metadata);
    let outcome = store.insert(&candidate, tags)?;
    if let InsertOutcome::AlreadyExists(id) = outcome {
        info!("{} is already cataloged as item {}", source, id);
    }
    Ok(outcome)
}

/// Provider id of a resource URL: the last path segment without query string.
///
/// `https://open.spotify.com/album/4aawyAB9vmqN3uQ7FjRGTy?si=abc` gives
/// `4aawyAB9vmqN3uQ7FjRGTy`. Returns `None` if there is no such segment.
pub fn source_id_from_url(url: &str) -> Option<&str> {
    let without_query = url.trim().split(['?', '#']).next().unwrap_or_default();
    without_query
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|id| !id.is_empty() && !id.contains(':'))
}
