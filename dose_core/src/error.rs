//! Error types for the dose_core library.

use std::io;

/// Result type alias using our Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for dose_core operations
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A referenced user, medication, enrollment or dose log does not exist
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Malformed input (non-positive values, empty schedule list, bad email...)
    #[error("Validation error: {0}")]
    Validation(String),

    /// Requested enrollment duration exceeds what the owned boxes can cover
    #[error(
        "insufficient medication: you have {total_pills} pills ({daily_consumption} pills/day), \
         maximum {max_days} days available, but requested {requested_days} days"
    )]
    InsufficientSupply {
        total_pills: u64,
        daily_consumption: f64,
        max_days: u64,
        requested_days: u32,
    },

    /// A medication with this name already exists
    #[error("medication already exists with name: {0}")]
    DuplicateName(String),

    /// A user with this email already exists
    #[error("email already exists: {0}")]
    DuplicateEmail(String),

    /// Opaque failure reported by a persistence collaborator
    #[error("Persistence error: {0}")]
    Persistence(String),

    /// IO error occurred
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// CSV error
    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    /// TOML parsing error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration validation error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl Error {
    pub(crate) fn not_found(entity: &'static str, id: impl ToString) -> Self {
        Error::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// True when the failure came from the storage layer rather than from
    /// domain rules.
    pub fn is_persistence(&self) -> bool {
        matches!(
            self,
            Error::Persistence(_) | Error::Io(_) | Error::Json(_) | Error::Csv(_)
        )
    }
}
