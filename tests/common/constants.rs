//! Shared constants for integration tests

// ============================================================================
// Test Catalog Content
// ============================================================================

pub const ARTIST_1: &str = "Boards of Canada";
pub const ARTIST_2: &str = "Stereolab";

pub const ITEM_1_URL: &str = "https://open.spotify.com/album/boc-mhtrtc";
pub const ITEM_2_URL: &str = "https://open.spotify.com/album/boc-geogaddi";
pub const ITEM_3_URL: &str = "https://open.spotify.com/album/stereolab-dots";

pub const TAG_ELECTRONIC: &str = "electronic";
pub const TAG_90S: &str = "90s";
pub const TAG_POP: &str = "pop";

/// Items in the fixture catalog
pub const TEST_ITEM_COUNT: usize = 3;

/// Distinct tags in the fixture catalog
pub const TEST_TAG_COUNT: usize = 3;
