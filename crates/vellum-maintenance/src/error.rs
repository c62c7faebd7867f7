//! Maintenance error types.

use thiserror::Error;
use vellum_core::error::{ConfigError, RepositoryError, StoreError};

/// Failures of a maintenance run.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required environment variable is missing or invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// Database connection or pool error.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// A schema migration failed to apply.
    #[error("migration error: {0}")]
    Migrate(#[from] sqlx::migrate::MigrateError),

    /// Index bootstrap or counter reconciliation failed.
    #[error("repository error: {0}")]
    Repository(#[from] RepositoryError),
}

impl From<ConfigError> for AppError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

impl From<StoreError> for AppError {
    fn from(err: StoreError) -> Self {
        Self::Repository(err.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_is_reported_as_repository_error() {
        let err = AppError::from(StoreError::InvalidIdentifier("Rose Garden".to_owned()));

        assert!(matches!(
            err,
            AppError::Repository(RepositoryError::Infrastructure(_))
        ));
        assert_eq!(
            err.to_string(),
            "repository error: infrastructure error: invalid identifier: Rose Garden"
        );
    }

    #[test]
    fn test_config_error_keeps_its_message() {
        let err = AppError::from(ConfigError::InvalidNumber {
            name: "VELLUM_HISTORY_MAX_LEN",
            value: "0".to_owned(),
        });

        assert_eq!(
            err.to_string(),
            "configuration error: VELLUM_HISTORY_MAX_LEN must be a positive integer, got \"0\""
        );
    }
}
