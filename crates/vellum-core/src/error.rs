//! Error types.
//!
//! Expected domain conditions (not found, version conflict, ...) are never
//! errors: they are reported through `Outcome::status`. The types here cover
//! only failures the repository cannot recover from.

use thiserror::Error;

/// Failure reported by a store backend.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached or rejected the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),

    /// A collection, key or field name is not usable by the backend.
    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}

/// Unrecoverable failure of a repository operation.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// An infrastructure/persistence error.
    #[error("infrastructure error: {0}")]
    Infrastructure(String),

    /// A document could not be encoded or decoded.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// A history entry carries a stream id that cannot be interpreted.
    #[error("corrupt history entry: {0}")]
    CorruptHistory(String),
}

impl From<StoreError> for RepositoryError {
    fn from(err: StoreError) -> Self {
        Self::Infrastructure(err.to_string())
    }
}

/// Invalid configuration value.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// An environment variable holds a value that does not parse.
    #[error("{name} must be a positive integer, got {value:?}")]
    InvalidNumber {
        /// The variable name.
        name: &'static str,
        /// The raw value found.
        value: String,
    },
}
