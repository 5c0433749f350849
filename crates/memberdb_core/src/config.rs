//! Store configuration.
//!
//! # Responsibility
//! - Describe storage location, busy timeout, logging and auditor settings.
//! - Load them from JSON or `MEMBERDB_*` environment variables.
//!
//! # Invariants
//! - Missing keys fall back to the defaults of [`StoreConfig::default`].

use crate::logging::{default_log_level, init_logging, LoggingError};
use serde::Deserialize;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::time::Duration;

pub const ENV_DB_PATH: &str = "MEMBERDB_DB_PATH";
pub const ENV_LOG_LEVEL: &str = "MEMBERDB_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "MEMBERDB_LOG_DIR";
pub const ENV_BUSY_TIMEOUT_MS: &str = "MEMBERDB_BUSY_TIMEOUT_MS";
pub const ENV_AUDITOR: &str = "MEMBERDB_AUDITOR";

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

/// Configuration error for JSON or environment loading.
#[derive(Debug)]
pub enum ConfigError {
    Json(serde_json::Error),
    InvalidEnv { name: &'static str, value: String },
}

impl Display for ConfigError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Json(err) => write!(f, "invalid store config: {err}"),
            Self::InvalidEnv { name, value } => {
                write!(f, "invalid value `{value}` for {name}")
            }
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Json(err) => Some(err),
            Self::InvalidEnv { .. } => None,
        }
    }
}

impl From<serde_json::Error> for ConfigError {
    fn from(value: serde_json::Error) -> Self {
        Self::Json(value)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Database file; `None` opens an in-memory database.
    pub db_path: Option<PathBuf>,
    pub log_level: Option<String>,
    /// Log directory; `None` leaves logging to the host.
    pub log_dir: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    /// Fixed auditor id stamped on created/modified members.
    pub auditor: Option<String>,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            db_path: None,
            log_level: None,
            log_dir: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            auditor: None,
        }
    }
}

impl StoreConfig {
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads `MEMBERDB_*` variables from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a config from any variable source. Empty values count as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let read = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let busy_timeout_ms = match read(ENV_BUSY_TIMEOUT_MS) {
            Some(raw) => raw
                .trim()
                .parse::<u64>()
                .map_err(|_| ConfigError::InvalidEnv {
                    name: ENV_BUSY_TIMEOUT_MS,
                    value: raw,
                })?,
            None => DEFAULT_BUSY_TIMEOUT_MS,
        };

        Ok(Self {
            db_path: read(ENV_DB_PATH).map(PathBuf::from),
            log_level: read(ENV_LOG_LEVEL),
            log_dir: read(ENV_LOG_DIR).map(PathBuf::from),
            busy_timeout_ms,
            auditor: read(ENV_AUDITOR),
        })
    }

    pub fn busy_timeout(&self) -> Duration {
        Duration::from_millis(self.busy_timeout_ms)
    }

    pub fn effective_log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or(default_log_level())
    }

    /// Starts file logging when `log_dir` is set; otherwise does nothing.
    pub fn init_logging(&self) -> Result<(), LoggingError> {
        match &self.log_dir {
            Some(dir) => init_logging(self.effective_log_level(), dir),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{ConfigError, StoreConfig, ENV_AUDITOR, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH};
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    #[test]
    fn json_fills_missing_keys_with_defaults() {
        let config = StoreConfig::from_json_str(r#"{"db_path": "/tmp/members.db"}"#).unwrap();
        assert_eq!(config.db_path, Some(PathBuf::from("/tmp/members.db")));
        assert_eq!(config.busy_timeout(), Duration::from_secs(5));
        assert!(config.auditor.is_none());
    }

    #[test]
    fn json_rejects_wrong_types() {
        let err = StoreConfig::from_json_str(r#"{"busy_timeout_ms": "soon"}"#).unwrap_err();
        assert!(matches!(err, ConfigError::Json(_)));
    }

    #[test]
    fn lookup_reads_variables_and_ignores_blank_values() {
        let vars = HashMap::from([
            (ENV_DB_PATH, "/data/members.db"),
            (ENV_BUSY_TIMEOUT_MS, "250"),
            (ENV_AUDITOR, "  "),
        ]);
        let config =
            StoreConfig::from_lookup(|name| vars.get(name).map(|value| value.to_string()))
                .unwrap();

        assert_eq!(config.db_path, Some(PathBuf::from("/data/members.db")));
        assert_eq!(config.busy_timeout_ms, 250);
        assert!(config.auditor.is_none());
        assert!(config.log_dir.is_none());
    }

    #[test]
    fn lookup_rejects_non_numeric_timeout() {
        let err = StoreConfig::from_lookup(|name| {
            (name == ENV_BUSY_TIMEOUT_MS).then(|| "fast".to_string())
        })
        .unwrap_err();
        assert!(matches!(
            err,
            ConfigError::InvalidEnv {
                name: ENV_BUSY_TIMEOUT_MS,
                ..
            }
        ));
    }

    #[test]
    fn init_logging_without_dir_is_a_no_op() {
        assert!(StoreConfig::default().init_logging().is_ok());
    }
}
