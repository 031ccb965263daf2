//! User configuration
//!
//! Read from `$HOME/.cleaner/config.toml`. Every key is optional and the
//! `CLEANER_DB_PATH` / `CLEANER_ACCOUNT` environment variables take
//! precedence over the file.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{CleanerError, Result};

pub const DB_PATH_ENV: &str = "CLEANER_DB_PATH";
pub const ACCOUNT_ENV: &str = "CLEANER_ACCOUNT";
pub const DEFAULT_EXPORT_PATTERN: &str = "transactions_{currency}.csv";
pub const FALLBACK_ACCOUNT: &str = "default";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub db_path: Option<PathBuf>,
    pub default_account: Option<String>,
    pub export_pattern: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            db_path: None,
            default_account: None,
            export_pattern: DEFAULT_EXPORT_PATTERN.to_string(),
        }
    }
}

impl Config {
    /// Account to use when the command line does not name one
    pub fn resolve_account(&self, explicit: Option<&str>) -> String {
        explicit
            .map(str::to_string)
            .or_else(|| self.default_account.clone())
            .unwrap_or_else(|| FALLBACK_ACCOUNT.to_string())
    }

    fn apply_overrides<F>(mut self, lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(path) = lookup(DB_PATH_ENV).filter(|v| !v.trim().is_empty()) {
            self.db_path = Some(PathBuf::from(path));
        }
        if let Some(account) = lookup(ACCOUNT_ENV).filter(|v| !v.trim().is_empty()) {
            self.default_account = Some(account);
        }
        self
    }
}

pub fn config_path() -> Result<PathBuf> {
    let home = std::env::var("HOME")
        .map_err(|_| CleanerError::Config("HOME environment variable not set".to_string()))?;
    Ok(PathBuf::from(home).join(".cleaner").join("config.toml"))
}

/// Load the config file (if any) and apply environment overrides
pub fn load_config() -> Result<Config> {
    let file = load_config_file(&config_path()?)?;
    Ok(file.apply_overrides(|key| std::env::var(key).ok()))
}

/// Parse a config file; a missing file yields the defaults
pub fn load_config_file(path: &Path) -> Result<Config> {
    if !path.exists() {
        debug!("No config file at {:?}, using defaults", path);
        return Ok(Config::default());
    }

    let content = fs::read_to_string(path)?;
    toml::from_str(&content)
        .map_err(|e| CleanerError::Config(format!("invalid {}: {}", path.display(), e)))
}
