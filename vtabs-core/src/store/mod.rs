//! Settings store.
//!
//! [`StorageArea`] is the raw asynchronous key-value facility (the role the
//! browser's local storage plays for an extension). [`SettingsStore`] layers
//! the recognized-settings table on top: default fallback on read, reset to
//! defaults, and log-and-continue error handling.

mod sqlite;

pub use sqlite::SqliteStorage;

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::config::{SettingName, Settings};

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Storage lock poisoned")]
    Poisoned,
}

/// Notification emitted for every successful write to a storage area.
#[derive(Debug, Clone, PartialEq)]
pub struct StorageChange {
    pub key: String,
    pub old_value: Option<Value>,
    pub new_value: Value,
}

/// Asynchronous key-value storage with change notifications.
#[async_trait]
pub trait StorageArea: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Value>, StoreError>;

    /// Every stored key. Absent keys are not back-filled.
    async fn get_all(&self) -> Result<Map<String, Value>, StoreError>;

    async fn set(&self, key: &str, value: Value) -> Result<(), StoreError>;

    /// Subscribe to change notifications.
    fn subscribe(&self) -> broadcast::Receiver<StorageChange>;
}

// =============================================================================
// Settings Store
// =============================================================================

/// Persisted settings with default fallback.
///
/// Never returns errors: storage failures are logged and execution continues.
#[derive(Clone)]
pub struct SettingsStore {
    area: Arc<dyn StorageArea>,
}

impl std::fmt::Debug for SettingsStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SettingsStore").finish_non_exhaustive()
    }
}

impl SettingsStore {
    pub fn new(area: Arc<dyn StorageArea>) -> Self {
        Self { area }
    }

    /// Persist `value` under `name`.
    ///
    /// Returns `false` if the write failed. Failures are logged, not retried.
    pub async fn set(&self, name: &str, value: Value) -> bool {
        match self.area.set(name, value).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(setting = %name, error = %e, "Failed to save setting");
                false
            }
        }
    }

    /// Read a setting.
    ///
    /// Absent recognized names resolve to their default without writing it.
    /// Absent unrecognized names resolve to `None`. A read failure is logged
    /// and treated as absent.
    pub async fn get(&self, name: &str) -> Option<Value> {
        let stored = match self.area.get(name).await {
            Ok(stored) => stored,
            Err(e) => {
                tracing::warn!(setting = %name, error = %e, "Failed to read setting, treating as absent");
                None
            }
        };

        if stored.is_some() {
            return stored;
        }

        tracing::debug!(setting = %name, "Setting not saved, using default value");
        match SettingName::parse(name) {
            Some(known) => Some(known.default_value().to_json()),
            None => {
                tracing::debug!(setting = %name, "No default value found for setting");
                None
            }
        }
    }

    /// Every persisted setting. Defaults are not filled in.
    pub async fn get_all(&self) -> Map<String, Value> {
        match self.area.get_all().await {
            Ok(all) => all,
            Err(e) => {
                tracing::warn!(error = %e, "Failed to read settings");
                Map::new()
            }
        }
    }

    /// Write every default value. Returns the names touched, in table order.
    ///
    /// Callers are responsible for announcing each touched name.
    pub async fn restore_defaults(&self) -> Vec<SettingName> {
        let mut touched = Vec::with_capacity(SettingName::ALL.len());
        for name in SettingName::ALL {
            self.set(name.as_str(), name.default_value().to_json()).await;
            touched.push(name);
        }
        touched
    }

    /// Typed view with defaults applied.
    pub async fn snapshot(&self) -> Settings {
        Settings::from_map(&self.get_all().await)
    }

    /// Whether peer diagnostics should be emitted.
    pub async fn debug_enabled(&self) -> bool {
        matches!(
            self.get(SettingName::Debug.as_str()).await,
            Some(Value::Bool(true))
        )
    }

    pub fn subscribe(&self) -> broadcast::Receiver<StorageChange> {
        self.area.subscribe()
    }
}

// =============================================================================
// Tests
// =============================================================================
