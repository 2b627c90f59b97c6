//! Persistent configuration for droidcheck.
//!
//! Stores harness settings in `~/.droidcheck/config.json`. Every field has a
//! default, so a partial file only overrides what it names and a missing file
//! means "use the defaults".
//!
//! # Example
//!
//! ```no_run
//! use droidcheck_core::config::HarnessConfig;
//!
//! // Load (returns defaults if file doesn't exist)
//! let config = HarnessConfig::load();
//! println!("endpoint: {}", config.endpoint);
//!
//! let session = config.to_session_config();
//! let timing = config.gestures.to_timing();
//! ```

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::gesture::{GesturePolicy, GestureTiming, DEFAULT_PRESS_HOLD, DEFAULT_SETTLE};
use crate::session::{SessionConfig, DEFAULT_ENDPOINT, DEFAULT_IMPLICIT_WAIT};

const CONFIG_DIRNAME: &str = ".droidcheck";
const CONFIG_FILENAME: &str = "config.json";

/// Errors reading or writing an explicit config file.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("failed to read config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid config {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Returns the droidcheck directory (`~/.droidcheck`).
pub fn droidcheck_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(CONFIG_DIRNAME)
}

/// Returns the default config file path (`~/.droidcheck/config.json`).
pub fn default_config_path() -> PathBuf {
    droidcheck_dir().join(CONFIG_FILENAME)
}

/// Swipe timing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GestureConfig {
    pub press_hold_ms: u64,
    pub settle_ms: u64,
    pub move_ms: u64,
    pub edge_border: i64,
    /// Swallow touch transport failures instead of failing the scenario.
    pub best_effort: bool,
}

impl Default for GestureConfig {
    fn default() -> Self {
        Self {
            press_hold_ms: DEFAULT_PRESS_HOLD.as_millis() as u64,
            settle_ms: DEFAULT_SETTLE.as_millis() as u64,
            move_ms: 0,
            edge_border: 0,
            best_effort: true,
        }
    }
}

impl GestureConfig {
    pub fn to_timing(&self) -> GestureTiming {
        GestureTiming {
            press_hold: Duration::from_millis(self.press_hold_ms),
            settle: Duration::from_millis(self.settle_ms),
            move_duration: Duration::from_millis(self.move_ms),
            edge_border: self.edge_border,
        }
    }

    pub fn policy(&self) -> GesturePolicy {
        if self.best_effort {
            GesturePolicy::BestEffort
        } else {
            GesturePolicy::Strict
        }
    }
}

/// Persistent droidcheck configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    /// WebDriver endpoint base URL.
    pub endpoint: String,
    pub implicit_wait_secs: u64,
    pub gestures: GestureConfig,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            implicit_wait_secs: DEFAULT_IMPLICIT_WAIT.as_secs(),
            gestures: GestureConfig::default(),
        }
    }
}

impl HarnessConfig {
    /// Load config from `~/.droidcheck/config.json`.
    ///
    /// Returns [`Default`] if the file does not exist or cannot be parsed.
    pub fn load() -> Self {
        std::fs::read_to_string(default_config_path())
            .ok()
            .and_then(|s| serde_json::from_str(&s).ok())
            .unwrap_or_default()
    }

    /// Load config from an explicit path, reporting any problem.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Save config to `path`, creating parent directories.
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let io_err = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_err)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        std::fs::write(path, json).map_err(io_err)
    }

    pub fn implicit_wait(&self) -> Duration {
        Duration::from_secs(self.implicit_wait_secs)
    }

    pub fn to_session_config(&self) -> SessionConfig {
        SessionConfig {
            endpoint: self.endpoint.clone(),
            implicit_wait: self.implicit_wait(),
        }
    }
}
