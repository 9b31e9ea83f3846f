//! Runtime configuration for database and logging bootstrap.
//!
//! # Responsibility
//! - Describe where the database lives and how its connection is tuned.
//! - Describe logging level and directory.
//! - Read both from `FRACTAL_*` environment variables.
//!
//! # Invariants
//! - `:memory:` as a path always selects a private in-memory database.
//! - Malformed environment values are rejected, never silently defaulted.

use crate::db::{DbError, DbResult};
use crate::logging::default_log_level;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const ENV_DB_PATH: &str = "FRACTAL_DB_PATH";
pub const ENV_BUSY_TIMEOUT_MS: &str = "FRACTAL_BUSY_TIMEOUT_MS";
pub const ENV_LOG_LEVEL: &str = "FRACTAL_LOG_LEVEL";
pub const ENV_LOG_DIR: &str = "FRACTAL_LOG_DIR";

pub const DEFAULT_DB_FILE_NAME: &str = "fractal.db";
const MEMORY_PATH: &str = ":memory:";
const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DbLocation {
    Memory,
    File(PathBuf),
}

impl DbLocation {
    fn from_path(path: &Path) -> Self {
        if path.as_os_str() == MEMORY_PATH {
            Self::Memory
        } else {
            Self::File(path.to_path_buf())
        }
    }

    pub(crate) fn mode(&self) -> &'static str {
        match self {
            Self::Memory => "memory",
            Self::File(_) => "file",
        }
    }
}

/// Connection settings applied by [`crate::db::open_with_config`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DbConfig {
    pub location: DbLocation,
    pub foreign_keys: bool,
    pub busy_timeout: Duration,
}

impl Default for DbConfig {
    fn default() -> Self {
        Self::file(DEFAULT_DB_FILE_NAME)
    }
}

impl DbConfig {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self {
            location: DbLocation::from_path(path.as_ref()),
            foreign_keys: true,
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }

    pub fn memory() -> Self {
        Self::file(MEMORY_PATH)
    }

    /// Reads `FRACTAL_DB_PATH` and `FRACTAL_BUSY_TIMEOUT_MS`.
    pub fn from_env() -> DbResult<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`DbConfig::from_env`] with an injectable variable source.
    ///
    /// # Errors
    /// - `DbError::InvalidConfig` when the path is blank or the timeout is
    ///   not a whole number of milliseconds.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> DbResult<Self> {
        let mut config = match lookup(ENV_DB_PATH) {
            Some(path) if path.trim().is_empty() => {
                return Err(DbError::InvalidConfig(format!("{ENV_DB_PATH} is blank")));
            }
            Some(path) => Self::file(path.trim()),
            None => Self::default(),
        };

        if let Some(raw) = lookup(ENV_BUSY_TIMEOUT_MS) {
            let millis = raw.trim().parse::<u64>().map_err(|err| {
                DbError::InvalidConfig(format!("{ENV_BUSY_TIMEOUT_MS}=`{raw}`: {err}"))
            })?;
            config.busy_timeout = Duration::from_millis(millis);
        }

        Ok(config)
    }
}

/// Logging settings consumed by [`crate::logging::init_logging`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub level: String,
    /// Absolute directory for rolling log files.
    pub log_dir: PathBuf,
}

impl LogConfig {
    pub fn new(level: impl Into<String>, log_dir: impl Into<PathBuf>) -> Self {
        Self {
            level: level.into(),
            log_dir: log_dir.into(),
        }
    }

    /// Reads `FRACTAL_LOG_LEVEL` and `FRACTAL_LOG_DIR`.
    ///
    /// Returns `None` when no log directory is configured.
    pub fn from_env() -> Option<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Option<Self> {
        let log_dir = lookup(ENV_LOG_DIR).filter(|dir| !dir.trim().is_empty())?;
        let level = lookup(ENV_LOG_LEVEL).unwrap_or_else(|| default_log_level().to_string());
        Some(Self::new(level, log_dir.trim()))
    }
}

#[cfg(test)]
mod tests {
    use super::{DbConfig, DbLocation, LogConfig, ENV_BUSY_TIMEOUT_MS, ENV_DB_PATH, ENV_LOG_DIR};
    use crate::db::DbError;
    use std::collections::HashMap;
    use std::path::PathBuf;
    use std::time::Duration;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect::<HashMap<_, _>>();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_to_file_in_working_directory() {
        let config = DbConfig::from_lookup(lookup(&[])).unwrap();
        assert_eq!(config.location, DbLocation::File(PathBuf::from("fractal.db")));
        assert!(config.foreign_keys);
        assert_eq!(config.busy_timeout, Duration::from_secs(5));
    }

    #[test]
    fn memory_path_selects_in_memory_database() {
        let config = DbConfig::from_lookup(lookup(&[(ENV_DB_PATH, ":memory:")])).unwrap();
        assert_eq!(config.location, DbLocation::Memory);
    }

    #[test]
    fn rejects_malformed_timeout_and_blank_path() {
        let err = DbConfig::from_lookup(lookup(&[(ENV_BUSY_TIMEOUT_MS, "soon")])).unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(message) if message.contains("soon")));

        let err = DbConfig::from_lookup(lookup(&[(ENV_DB_PATH, "  ")])).unwrap_err();
        assert!(matches!(err, DbError::InvalidConfig(_)));
    }

    #[test]
    fn timeout_is_read_in_milliseconds() {
        let config = DbConfig::from_lookup(lookup(&[(ENV_BUSY_TIMEOUT_MS, "250")])).unwrap();
        assert_eq!(config.busy_timeout, Duration::from_millis(250));
    }

    #[test]
    fn log_config_requires_a_directory() {
        assert!(LogConfig::from_lookup(lookup(&[])).is_none());
        let config = LogConfig::from_lookup(lookup(&[(ENV_LOG_DIR, "/tmp/fractal-logs")])).unwrap();
        assert_eq!(config.log_dir, PathBuf::from("/tmp/fractal-logs"));
        assert!(!config.level.is_empty());
    }
}
