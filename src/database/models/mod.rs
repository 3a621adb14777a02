pub mod entry;
pub mod prekey;
pub mod profile;

use std::collections::HashMap;
use thiserror::Error;

pub use entry::{ColumnValue, Entry, EntryBody, EntryCategory, EntryPatch, EntryRef, EntryUpdate, NewEntry};
pub use prekey::{ClaimedBundle, OneTimePreKey, PreKeyBundle, SignedPreKey, UserIdentity};
pub use profile::{Profile, ProfileSummary, ProfileUpdate};

/// Longest text value accepted for any free-text column
pub const MAX_TEXT_LEN: usize = 10_000;

/// Client input that cannot be turned into a valid model
#[derive(Debug, Error, PartialEq)]
pub enum ValidationError {
    #[error("Unknown entry table '{0}'")]
    UnknownCategory(String),

    #[error("Unknown selected_index {0}; expected 0, 1 or 2")]
    UnknownIndex(i64),

    #[error("Field '{0}' is assigned by the server")]
    ReservedField(String),

    #[error("Field '{0}' is required")]
    MissingField(String),

    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("Update contains no fields")]
    EmptyPatch,

    #[error("Malformed body: {0}")]
    Malformed(String),
}

impl ValidationError {
    pub fn invalid(field: impl Into<String>, message: impl Into<String>) -> Self {
        ValidationError::InvalidField {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Per-field detail for the error response, if the error is about one field
    pub fn field_errors(&self) -> Option<HashMap<String, String>> {
        let (field, message) = match self {
            ValidationError::ReservedField(f) => (f.clone(), "assigned by the server".to_string()),
            ValidationError::MissingField(f) => (f.clone(), "this field is required".to_string()),
            ValidationError::InvalidField { field, message } => (field.clone(), message.clone()),
            _ => return None,
        };
        let mut errors = HashMap::new();
        errors.insert(field, message);
        Some(errors)
    }
}

pub(crate) fn check_text(field: &str, value: &str) -> Result<(), ValidationError> {
    if value.chars().count() > MAX_TEXT_LEN {
        return Err(ValidationError::invalid(
            field,
            format!("must be at most {} characters", MAX_TEXT_LEN),
        ));
    }
    Ok(())
}
