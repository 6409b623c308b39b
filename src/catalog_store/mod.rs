mod error;
mod models;
mod queries;
mod schema;
mod snapshot;
mod store;
mod tags;
mod trait_def;
mod validation;

pub use error::{CatalogError, CatalogResult};
pub use models::*;
pub use schema::CATALOG_SCHEMA;
pub use store::SqliteCatalogStore;
pub use trait_def::{CatalogStore, QueryEngine, TagRegistry};
pub use validation::{validate_candidate, validate_label, ValidationError};
