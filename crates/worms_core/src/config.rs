//! Runtime configuration for catalog binaries.
//!
//! Values resolve in order: explicit overrides, then `WORMS_*` environment
//! variables, then defaults (in-memory store, build-mode log level, no file
//! logging).

use crate::logging::{default_log_level, normalize_level};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;

pub const ENV_DB_PATH: &str = "WORMS_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "WORMS_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "WORMS_LOG_DIR";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    InvalidLogLevel { source: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidLogLevel { source, value } => {
                write!(f, "invalid log level `{value}` from {source}")
            }
        }
    }
}

impl Error for ConfigError {}

/// Resolved catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogConfig {
    /// SQLite file path; `None` keeps the catalog in memory.
    pub db_path: Option<PathBuf>,
    pub log_level: &'static str,
    /// File logging directory; `None` disables file logging.
    pub log_dir: Option<PathBuf>,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: default_log_level(),
            log_dir: None,
        }
    }
}

impl CatalogConfig {
    /// Reads `WORMS_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`; blank values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let log_level = match read(ENV_LOG_LEVEL) {
            Some(level) => parse_level(ENV_LOG_LEVEL, &level)?,
            None => default_log_level(),
        };
        Ok(Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            log_level,
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
        })
    }

    /// Applies explicit overrides, typically from command-line flags.
    pub fn with_overrides(
        mut self,
        db_path: Option<PathBuf>,
        log_level: Option<&str>,
        log_dir: Option<PathBuf>,
    ) -> Result<Self, ConfigError> {
        if db_path.is_some() {
            self.db_path = db_path;
        }
        if log_dir.is_some() {
            self.log_dir = log_dir;
        }
        if let Some(level) = log_level {
            self.log_level = parse_level("command line", level)?;
        }
        Ok(self)
    }
}

fn parse_level(source: &'static str, value: &str) -> Result<&'static str, ConfigError> {
    normalize_level(value).map_err(|_| ConfigError::InvalidLogLevel {
        source,
        value: value.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::{CatalogConfig, ConfigError, ENV_DB_PATH, ENV_LOG_DIR, ENV_LOG_LEVEL};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn empty_environment_yields_defaults() {
        let config = CatalogConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config, CatalogConfig::default());
        assert_eq!(config.db_path, None);
    }

    #[test]
    fn environment_values_are_read_and_blank_values_ignored() {
        let config = CatalogConfig::from_lookup(lookup(&[
            (ENV_DB_PATH, "/tmp/worms.db"),
            (ENV_LOG_LEVEL, "WARNING"),
            (ENV_LOG_DIR, "  "),
        ]))
        .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/worms.db")));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, None);
    }

    #[test]
    fn overrides_win_over_environment() {
        let config = CatalogConfig::from_lookup(lookup(&[(ENV_DB_PATH, "/tmp/env.db")]))
            .unwrap()
            .with_overrides(Some(PathBuf::from("/tmp/cli.db")), Some("error"), None)
            .unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/cli.db")));
        assert_eq!(config.log_level, "error");
    }

    #[test]
    fn invalid_level_names_its_source() {
        let err = CatalogConfig::from_lookup(lookup(&[(ENV_LOG_LEVEL, "loud")])).unwrap_err();
        assert_eq!(
            err,
            ConfigError::InvalidLogLevel {
                source: ENV_LOG_LEVEL,
                value: "loud".to_string()
            }
        );
    }
}
