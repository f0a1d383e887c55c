//! Configuration module for the settings bridge.
//!
//! - [`settings`]: the recognized extension settings and their defaults.
//! - [`bridge`]: runtime configuration of the bridge process itself.

mod bridge;
mod settings;

pub use bridge::{BridgeConfig, ConfigError, DEFAULT_LEGACY_ENDPOINT};
pub use settings::{SettingName, SettingValue, Settings, ValueKind};
