//! Process-level configuration.
//!
//! Values come from environment variables; blank values fall back to
//! defaults.
//!
//! | Variable             | Default                               |
//! |----------------------|---------------------------------------|
//! | `LEADLIST_DB_PATH`   | `<temp dir>/leadlist.sqlite3`         |
//! | `LEADLIST_LOG_LEVEL` | `debug` in debug builds, else `info`  |
//! | `LEADLIST_LOG_DIR`   | unset: no file logging                |

use crate::db::{open_db, DbResult};
use crate::logging::{default_log_level, init_logging, LoggingError};
use rusqlite::Connection;
use std::path::PathBuf;

pub const DB_PATH_ENV: &str = "LEADLIST_DB_PATH";
pub const LOG_LEVEL_ENV: &str = "LEADLIST_LOG_LEVEL";
pub const LOG_DIR_ENV: &str = "LEADLIST_LOG_DIR";
const DEFAULT_DB_FILE_NAME: &str = "leadlist.sqlite3";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CoreConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    pub log_dir: Option<PathBuf>,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            db_path: std::env::temp_dir().join(DEFAULT_DB_FILE_NAME),
            log_level: default_log_level().to_string(),
            log_dir: None,
        }
    }
}

impl CoreConfig {
    /// Reads configuration from the process environment.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads configuration through `lookup`, treating blank values as unset.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let defaults = Self::default();
        Self {
            db_path: read(DB_PATH_ENV).map(PathBuf::from).unwrap_or(defaults.db_path),
            log_level: read(LOG_LEVEL_ENV).unwrap_or(defaults.log_level),
            log_dir: read(LOG_DIR_ENV).map(PathBuf::from),
        }
    }

    /// Starts file logging when `log_dir` is set.
    ///
    /// Returns whether file logging is active afterwards.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        let Some(log_dir) = self.log_dir.as_ref() else {
            return Ok(false);
        };
        let log_dir = log_dir.to_string_lossy();
        init_logging(&self.log_level, &log_dir)?;
        Ok(true)
    }

    /// Opens and migrates the configured database.
    pub fn open_db(&self) -> DbResult<Connection> {
        open_db(&self.db_path)
    }
}
