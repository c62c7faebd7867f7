//! Maintenance configuration, read from the environment.

use crate::error::AppError;

/// Pool size used when `DATABASE_MAX_CONNECTIONS` is unset.
pub const DEFAULT_MAX_CONNECTIONS: u32 = 10;

/// Connection settings for a maintenance run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MaintenanceConfig {
    /// Postgres connection string.
    pub database_url: String,
    /// Upper bound of the connection pool.
    pub max_connections: u32,
}

impl MaintenanceConfig {
    /// Reads `DATABASE_URL` (required) and `DATABASE_MAX_CONNECTIONS`.
    ///
    /// # Errors
    ///
    /// Returns `AppError::Config` if `DATABASE_URL` is unset or
    /// `DATABASE_MAX_CONNECTIONS` is not a positive integer.
    pub fn from_env() -> Result<Self, AppError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, AppError> {
        let database_url = lookup("DATABASE_URL")
            .filter(|url| !url.trim().is_empty())
            .ok_or_else(|| {
                AppError::Config("DATABASE_URL environment variable must be set".to_owned())
            })?;

        let max_connections = match lookup("DATABASE_MAX_CONNECTIONS") {
            None => DEFAULT_MAX_CONNECTIONS,
            Some(raw) => match raw.trim().parse::<u32>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(AppError::Config(format!(
                        "DATABASE_MAX_CONNECTIONS must be a positive integer, got {raw:?}"
                    )));
                }
            },
        };

        Ok(Self {
            database_url,
            max_connections,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const URL: &str = "postgres://vellum@localhost/vellum";

    #[test]
    fn test_database_url_is_required() {
        let result = MaintenanceConfig::from_lookup(|_| None);
        assert!(matches!(result, Err(AppError::Config(_))));
    }

    #[test]
    fn test_max_connections_defaults_to_ten() {
        let config = MaintenanceConfig::from_lookup(|name| {
            (name == "DATABASE_URL").then(|| URL.to_owned())
        })
        .unwrap();

        assert_eq!(config.database_url, URL);
        assert_eq!(config.max_connections, 10);
    }

    #[test]
    fn test_max_connections_override() {
        let config = MaintenanceConfig::from_lookup(|name| match name {
            "DATABASE_URL" => Some(URL.to_owned()),
            "DATABASE_MAX_CONNECTIONS" => Some("4".to_owned()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.max_connections, 4);
    }

    #[test]
    fn test_zero_max_connections_is_rejected() {
        let result = MaintenanceConfig::from_lookup(|name| match name {
            "DATABASE_URL" => Some(URL.to_owned()),
            "DATABASE_MAX_CONNECTIONS" => Some("0".to_owned()),
            _ => None,
        });

        assert!(matches!(result, Err(AppError::Config(_))));
    }
}
