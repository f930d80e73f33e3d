//! Process configuration for API hosts.
//!
//! # Responsibility
//! - Resolve database path and logging settings from the environment once.
//! - Start core logging when a log directory is configured.
//!
//! # Invariants
//! - `ApiConfig::global()` reads the environment at most once per process.
//! - Blank variables are treated as unset.

use clinic_core::{default_log_level, init_logging, LoggingError};
use once_cell::sync::OnceCell;
use std::path::PathBuf;

pub const DB_PATH_VAR: &str = "CLINIC_DB_PATH";
pub const LOG_LEVEL_VAR: &str = "CLINIC_LOG_LEVEL";
pub const LOG_DIR_VAR: &str = "CLINIC_LOG_DIR";

const DEFAULT_DB_FILE_NAME: &str = "clinic.sqlite3";

static GLOBAL_CONFIG: OnceCell<ApiConfig> = OnceCell::new();

/// Resolved host configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApiConfig {
    pub db_path: PathBuf,
    pub log_level: String,
    /// Logging stays off when unset.
    pub log_dir: Option<PathBuf>,
}

impl ApiConfig {
    /// Process-wide configuration, resolved from the environment on first use.
    pub fn global() -> &'static ApiConfig {
        GLOBAL_CONFIG.get_or_init(|| Self::from_lookup(|key| std::env::var(key).ok()))
    }

    /// Builds a configuration from an arbitrary variable source.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let read = |key: &str| {
            lookup(key)
                .map(|raw| raw.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        Self {
            db_path: read(DB_PATH_VAR)
                .map(PathBuf::from)
                .unwrap_or_else(|| std::env::temp_dir().join(DEFAULT_DB_FILE_NAME)),
            log_level: read(LOG_LEVEL_VAR).unwrap_or_else(|| default_log_level().to_string()),
            log_dir: read(LOG_DIR_VAR).map(PathBuf::from),
        }
    }

    /// Starts core logging if a directory is configured.
    ///
    /// Returns `Ok(false)` when logging is not configured.
    pub fn init_logging(&self) -> Result<bool, LoggingError> {
        let Some(log_dir) = &self.log_dir else {
            return Ok(false);
        };
        init_logging(&self.log_level, &log_dir.to_string_lossy())?;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::{ApiConfig, DB_PATH_VAR, LOG_DIR_VAR, LOG_LEVEL_VAR};
    use std::collections::HashMap;
    use std::path::PathBuf;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_apply_when_unset_or_blank() {
        let config = ApiConfig::from_lookup(lookup(&[(DB_PATH_VAR, "   ")]));
        assert_eq!(config.db_path, std::env::temp_dir().join("clinic.sqlite3"));
        assert_eq!(config.log_level, clinic_core::default_log_level());
        assert!(config.log_dir.is_none());
        assert_eq!(config.init_logging(), Ok(false));
    }

    #[test]
    fn explicit_values_are_trimmed() {
        let config = ApiConfig::from_lookup(lookup(&[
            (DB_PATH_VAR, " /srv/clinic/db.sqlite3 "),
            (LOG_LEVEL_VAR, "warn"),
            (LOG_DIR_VAR, "/var/log/clinic"),
        ]));
        assert_eq!(config.db_path, PathBuf::from("/srv/clinic/db.sqlite3"));
        assert_eq!(config.log_level, "warn");
        assert_eq!(config.log_dir, Some(PathBuf::from("/var/log/clinic")));
    }

    #[test]
    fn relative_log_dir_is_rejected_by_logging() {
        let config = ApiConfig::from_lookup(lookup(&[(LOG_DIR_VAR, "logs")]));
        assert!(config.init_logging().is_err());
    }
}
