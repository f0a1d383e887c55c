//! Runtime configuration for the bridge process.
//!
//! Read from an optional JSON file; every field has a default so an empty
//! object (or no file at all) is a valid configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Name of the persistent connection to the legacy component.
pub const DEFAULT_LEGACY_ENDPOINT: &str = "connection-to-legacy";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Bridge runtime configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Endpoint name of the legacy port.
    pub legacy_endpoint: String,

    /// Delay before asking the legacy peer for its values.
    /// The legacy side has no readiness signal; this is a heuristic only.
    pub startup_delay_ms: u64,

    /// Maximum number of reply hops a message chain may take through the
    /// dispatch queue before it is dropped.
    pub max_reply_hops: u8,

    /// Settings database location. `None` uses the platform data directory.
    pub database_path: Option<PathBuf>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            legacy_endpoint: DEFAULT_LEGACY_ENDPOINT.to_string(),
            startup_delay_ms: 100,
            max_reply_hops: 8,
            database_path: None,
        }
    }
}

impl BridgeConfig {
    /// Load configuration from a JSON file.
    ///
    /// A missing file yields defaults. A file that exists but can't be read
    /// or parsed is an error.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = match std::fs::read_to_string(path) {
            Ok(text) => text,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file, using defaults");
                return Ok(Self::default());
            }
            Err(source) => {
                return Err(ConfigError::Io {
                    path: path.to_path_buf(),
                    source,
                })
            }
        };

        serde_json::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Default config file location: `<config dir>/vtabs/bridge.json`.
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("vtabs").join("bridge.json"))
    }

    pub fn startup_delay(&self) -> Duration {
        Duration::from_millis(self.startup_delay_ms)
    }
}
