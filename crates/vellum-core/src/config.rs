//! Repository configuration.

use crate::error::ConfigError;

/// Default ceiling for unpaginated reads and for page sizes.
pub const DEFAULT_MAX_ENTITY_COUNT: usize = 1000;

/// Default number of history records retained per entity.
pub const DEFAULT_HISTORY_MAX_LEN: usize = 10;

/// Tunables shared by every repository built from the same stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RepositoryConfig {
    /// Unpaginated reads are refused above this many documents, and page
    /// sizes are clamped to it.
    pub max_entity_count: usize,
    /// Approximate number of history records kept per entity.
    pub history_max_len: usize,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            max_entity_count: DEFAULT_MAX_ENTITY_COUNT,
            history_max_len: DEFAULT_HISTORY_MAX_LEN,
        }
    }
}

impl RepositoryConfig {
    /// Reads `VELLUM_MAX_ENTITY_COUNT` and `VELLUM_HISTORY_MAX_LEN`, falling
    /// back to the defaults for unset variables.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidNumber` if a variable is set but is not a
    /// positive integer.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            max_entity_count: parse_positive(
                "VELLUM_MAX_ENTITY_COUNT",
                lookup("VELLUM_MAX_ENTITY_COUNT"),
                defaults.max_entity_count,
            )?,
            history_max_len: parse_positive(
                "VELLUM_HISTORY_MAX_LEN",
                lookup("VELLUM_HISTORY_MAX_LEN"),
                defaults.history_max_len,
            )?,
        })
    }
}

fn parse_positive(
    name: &'static str,
    raw: Option<String>,
    default: usize,
) -> Result<usize, ConfigError> {
    match raw {
        None => Ok(default),
        Some(value) => match value.trim().parse::<usize>() {
            Ok(n) if n > 0 => Ok(n),
            _ => Err(ConfigError::InvalidNumber { name, value }),
        },
    }
}
