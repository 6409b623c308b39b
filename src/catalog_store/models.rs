//! Catalog models for the SQLite-backed store.
//!
//! Items are cataloged works (albums, tracks, ...) keyed by the URL of the
//! external resource they were resolved from. Tags are free-form labels
//! attached to items through a many-to-many association.

use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

lazy_static! {
    static ref LEADING_YEAR: Regex = Regex::new(r"^\s*(\d{4})").unwrap();
}

// =============================================================================
// Identifiers
// =============================================================================

/// Store-assigned item identifier. Never reused after the item is deleted.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub i64);

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagId(pub i64);

// =============================================================================
// Entities
// =============================================================================

/// A cataloged work.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    pub artist: String,
    pub name: String,
    /// Free-form date as supplied by the metadata provider ('2023-05-15', '2023-05', '2023')
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub source_url: String,
    /// Work category, e.g. 'album', 'single', 'compilation'
    pub item_type: Option<String>,
}

/// A free-form label. Labels compare case-sensitively.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub id: TagId,
    pub label: String,
}

/// The fields of an item that does not exist yet.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemCandidate {
    pub artist: String,
    pub name: String,
    pub release_date: Option<String>,
    pub release_year: Option<i32>,
    pub source_url: String,
    pub item_type: Option<String>,
}

impl ItemCandidate {
    pub fn new(
        artist: impl Into<String>,
        name: impl Into<String>,
        source_url: impl Into<String>,
    ) -> Self {
        ItemCandidate {
            artist: artist.into(),
            name: name.into(),
            source_url: source_url.into(),
            ..Default::default()
        }
    }

    pub fn with_release_date(mut self, release_date: impl Into<String>) -> Self {
        self.release_date = Some(release_date.into());
        self
    }

    pub fn with_release_year(mut self, release_year: i32) -> Self {
        self.release_year = Some(release_year);
        self
    }

    pub fn with_item_type(mut self, item_type: impl Into<String>) -> Self {
        self.item_type = Some(item_type.into());
        self
    }

    /// The explicit release year if one was given, otherwise the one derived
    /// from the release date.
    pub fn effective_release_year(&self) -> Option<i32> {
        self.release_year.or_else(|| {
            self.release_date
                .as_deref()
                .and_then(release_year_from_date)
        })
    }
}

// =============================================================================
// Outcomes
// =============================================================================

/// Result of a successful insert call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum InsertOutcome {
    Inserted(ItemId),
    /// An item with the same source URL was already cataloged, nothing changed.
    AlreadyExists(ItemId),
}

impl InsertOutcome {
    pub fn item_id(&self) -> ItemId {
        match self {
            InsertOutcome::Inserted(id) | InsertOutcome::AlreadyExists(id) => *id,
        }
    }

    pub fn is_inserted(&self) -> bool {
        matches!(self, InsertOutcome::Inserted(_))
    }
}

/// Result of a successful delete call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum DeleteOutcome {
    Deleted,
    NotFound,
}

// =============================================================================
// Helpers
// =============================================================================

/// Extract the year from a free-form release date.
pub fn release_year_from_date(date: &str) -> Option<i32> {
    LEADING_YEAR
        .captures(date)
        .and_then(|c| c.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Trim labels, drop the empty ones and collapse duplicates.
pub fn normalize_labels<I, S>(labels: I) -> BTreeSet<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    labels
        .into_iter()
        .map(|l| l.as_ref().trim().to_string())
        .filter(|l| !l.is_empty())
        .collect()
}

/// Split a comma separated label list, as typed by a user.
pub fn parse_label_list(s: &str) -> Vec<String> {
    normalize_labels(s.split(',')).into_iter().collect()
}
