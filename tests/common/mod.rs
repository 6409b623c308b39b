//! Common test infrastructure
//!
//! On-disk catalogs live in a `TempDir` that is removed when the returned
//! guard is dropped, so keep it alive for the whole test.

mod constants;
mod fixtures;

pub use constants::*;
#[allow(unused_imports)]
pub use fixtures::{create_test_catalog, labels, open_test_catalog};
