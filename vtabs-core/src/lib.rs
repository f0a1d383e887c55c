//! Vertical Tabs Reloaded settings core.
//!
//! Keeps the extension's settings consistent between the background process,
//! the legacy component, and content scripts. It includes:
//!
//! - The recognized settings table with typed defaults
//! - A SQLite-backed local storage area with change notifications
//! - The settings store (default fallback, reset, log-and-continue errors)
//! - The tagged JSON message protocol
//! - The legacy port and runtime broadcast bus transports
//! - The sync broker that relays changes between all of them

pub mod broker;
pub mod config;
pub mod db;
pub mod protocol;
pub mod store;
pub mod transport;

// Re-exports for convenience
pub use broker::{Origin, PeerInbound, SyncBroker};
pub use config::{
    BridgeConfig, ConfigError, SettingName, SettingValue, Settings, ValueKind,
    DEFAULT_LEGACY_ENDPOINT,
};
pub use db::Database;
pub use protocol::Message;
pub use store::{SettingsStore, SqliteStorage, StorageArea, StorageChange, StoreError};
pub use transport::{
    BroadcastBus, BusListener, BusPublisher, BusSender, Envelope, LegacyPort, PeerReceiver,
    PendingReply, PortPeer, Transport,
};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn version_is_set() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn exports_are_accessible() {
        fn _check_types(
            _db: &Database,
            _settings: &Settings,
            _name: SettingName,
            _store: &SettingsStore,
            _broker: &SyncBroker,
            _message: &Message,
            _port: &LegacyPort,
            _bus: &BroadcastBus,
            _config: &BridgeConfig,
        ) {
        }
    }
}
