use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use thiserror::Error;

// =============================================================================
// Time-related constants
// =============================================================================

/// Default interval between scheduled checks in seconds (1 hour)
pub const DEFAULT_CHECK_INTERVAL_SECS: u64 = 60 * 60;

/// Timeout for the page fetch in seconds
pub const FETCH_TIMEOUT_SECS: u64 = 30;

// =============================================================================
// Page-related constants
// =============================================================================

/// Page listing the full installer packages published by Apple
pub const DEFAULT_PAGE_URL: &str =
    "https://mrmacintosh.com/macos-sequoia-full-installer-database-download-directly-from-apple/";

/// Browser-like user agent; the page rejects obvious bots
pub const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36";

/// Filename suffix identifying installer package links
pub const DEFAULT_LINK_SUFFIX: &str = "InstallAssistant.pkg";

// =============================================================================
// History status markers
// =============================================================================

pub const SUCCESS_STATUS: &str = "success";
pub const ERROR_STATUS_PREFIX: &str = "error: ";

const APP_NAME: &str = "macos-release-watch";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Invalid config file {path:?}: {source}")]
    Invalid {
        path: PathBuf,
        source: serde_json::Error,
    },
}

/// Watcher configuration structure
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct WatchConfig {
    pub page_url: String,
    pub check_interval_secs: u64,
    pub fetch_timeout_secs: u64,
    pub user_agent: String,
    pub link_suffix: String,
    /// Overrides the database location inside the data directory
    pub db_path: Option<PathBuf>,
    /// Labels of the chats/channels notifications are delivered to
    pub notify_targets: Vec<String>,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            page_url: DEFAULT_PAGE_URL.to_string(),
            check_interval_secs: DEFAULT_CHECK_INTERVAL_SECS,
            fetch_timeout_secs: FETCH_TIMEOUT_SECS,
            user_agent: DEFAULT_USER_AGENT.to_string(),
            link_suffix: DEFAULT_LINK_SUFFIX.to_string(),
            db_path: None,
            notify_targets: vec!["log".to_string()],
        }
    }
}

impl WatchConfig {
    /// Load the configuration from `path`.
    ///
    /// A missing file yields the defaults; fields absent from the file keep
    /// their default values.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = match std::fs::read_to_string(path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };

        serde_json::from_str(&content).map_err(|source| ConfigError::Invalid {
            path: path.to_path_buf(),
            source,
        })
    }

    pub fn check_interval(&self) -> Duration {
        Duration::from_secs(self.check_interval_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }

    /// Database location: the configured path or `releases.db` in the data directory
    pub fn resolved_db_path(&self) -> PathBuf {
        self.db_path.clone().unwrap_or_else(db_path)
    }
}

/// Returns the path to the data directory.
/// Uses $XDG_DATA_HOME/macos-release-watch if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/macos-release-watch,
/// or ./macos-release-watch if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("releases.db")
}

/// Returns the path to the log file.
pub fn log_path() -> PathBuf {
    data_dir().join(format!("{}.log", APP_NAME))
}

/// Returns the default path of the config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join(APP_NAME)
}
