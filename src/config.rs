//! Configuration for the Seshat session coordinator
//!
//! Settings resolve through a cascade: explicit CLI value, then the
//! SESHAT_DATA_DIR environment variable, then an optional `seshat.toml`
//! in the working directory, then built-in defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::{Result, SeshatError};

/// Optional per-project configuration file
const CONFIG_FILE: &str = "seshat.toml";

/// Environment override for the data directory
const DATA_DIR_ENV: &str = "SESHAT_DATA_DIR";

/// Seshat configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SeshatConfig {
    /// Root directory for preferences and snapshots
    pub data_dir: PathBuf,

    /// Snapshot subdirectory name under the data directory
    pub snapshot_dir: String,

    /// Search debounce window in milliseconds
    pub search_debounce_ms: u64,

    /// Maximum entries kept in the recent-documents list
    pub recent_documents_cap: usize,
}

impl Default for SeshatConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            snapshot_dir: "snapshots".to_string(),
            search_debounce_ms: 300,
            recent_documents_cap: 16,
        }
    }
}

impl SeshatConfig {
    /// Resolve configuration through the cascade
    ///
    /// `cli_data_dir` wins over everything; the environment variable wins
    /// over the config file; the config file wins over defaults.
    pub fn resolve(cli_data_dir: Option<PathBuf>) -> Result<Self> {
        let mut cfg = match std::fs::read_to_string(CONFIG_FILE) {
            Ok(raw) => Self::from_toml_str(&raw)?,
            Err(_) => Self::default(),
        };

        if let Ok(dir) = std::env::var(DATA_DIR_ENV) {
            if !dir.is_empty() {
                cfg.data_dir = PathBuf::from(dir);
            }
        }
        if let Some(dir) = cli_data_dir {
            cfg.data_dir = dir;
        }
        Ok(cfg)
    }

    /// Parse a TOML document; missing keys fall back to defaults
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        toml::from_str(raw).map_err(|e| {
            SeshatError::Config(config::ConfigError::Message(format!(
                "invalid {}: {}",
                CONFIG_FILE, e
            )))
        })
    }

    /// Directory the snapshot pairs live in
    pub fn snapshot_path(&self) -> PathBuf {
        self.data_dir.join(&self.snapshot_dir)
    }

    /// Path of the preference file
    pub fn prefs_path(&self) -> PathBuf {
        self.data_dir.join("prefs.json")
    }

    /// Search debounce window as a Duration
    pub fn search_debounce(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.search_debounce_ms)
    }
}

/// Platform data directory, falling back to a dot directory in cwd
fn default_data_dir() -> PathBuf {
    directories::ProjectDirs::from("io", "seshat", "seshat")
        .map(|dirs| dirs.data_dir().to_path_buf())
        .unwrap_or_else(|| PathBuf::from(".seshat"))
}
