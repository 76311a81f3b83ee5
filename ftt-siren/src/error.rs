//! Error types for ftt-siren
//!
//! Per-target errors are recorded in the run report and the batch continues.
//! `Configuration` and `RateLimited` stop the run (see [`MatchError::is_fatal`]).

use thiserror::Error;

/// Matcher error taxonomy
#[derive(Debug, Error)]
pub enum MatchError {
    /// Missing credentials or settings; nothing is processed
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Target name unusable as a registry query
    #[error("Invalid target: {0}")]
    Validation(String),

    /// Registry answered with a non-success status other than "no results"
    #[error("Sirene search failed: {status} {message}")]
    RegistryUnavailable { status: u16, message: String },

    /// Registry answered HTTP 429
    #[error("Rate limit exceeded - wait and retry")]
    RateLimited,

    /// Transport failure (connection, timeout)
    #[error("Network error: {0}")]
    Network(String),

    /// Registry payload could not be decoded
    #[error("Parse error: {0}")]
    Parse(String),

    /// Target list could not be read from the datastore
    #[error("Failed to fetch companies: {0}")]
    DatastoreRead(String),

    /// Identifier write-back failed
    #[error("Failed to update: {0}")]
    DatastoreWrite(String),
}

impl MatchError {
    /// Whether this error must stop the batch instead of being recorded
    /// against a single target
    pub fn is_fatal(&self) -> bool {
        matches!(self, MatchError::Configuration(_) | MatchError::RateLimited)
    }
}

impl From<sqlx::Error> for MatchError {
    fn from(err: sqlx::Error) -> Self {
        MatchError::DatastoreRead(err.to_string())
    }
}

/// Result type for matcher operations
pub type MatchResult<T> = Result<T, MatchError>;
