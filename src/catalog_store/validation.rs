//! Validation of catalog entities before they reach the database.

use super::models::ItemCandidate;
use std::fmt;

/// Validation error types
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    EmptyField { field: &'static str },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::EmptyField { field } => {
                write!(f, "Field '{}' is required but was empty", field)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Result type for validation operations
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Validate an item candidate. Required fields are checked after trimming.
pub fn validate_candidate(candidate: &ItemCandidate) -> ValidationResult<()> {
    if candidate.source_url.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "source_url" });
    }
    if candidate.artist.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "artist" });
    }
    if candidate.name.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "name" });
    }
    Ok(())
}

/// Validate a tag label.
pub fn validate_label(label: &str) -> ValidationResult<()> {
    if label.trim().is_empty() {
        return Err(ValidationError::EmptyField { field: "label" });
    }
    Ok(())
}
