//! Message protocol shared by the background process, the legacy component,
//! and content scripts.
//!
//! Every message is a JSON object tagged by its `type` field.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::config::SettingName;

/// A protocol message. Transient; never persisted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// Ask the receiver for the current value of `name`.
    #[serde(rename = "settings.get")]
    Get { name: String },

    /// Current value of a single setting.
    #[serde(rename = "settings.post")]
    Post {
        name: String,
        #[serde(default)]
        value: Value,
    },

    /// The entire stored mapping.
    #[serde(rename = "settings.post-all")]
    PostAll { value: Map<String, Value> },

    /// Legacy-format write request, bridged into `settings.post`.
    #[serde(rename = "settings.post-to-sdk")]
    PostToSdk {
        name: String,
        #[serde(default)]
        value: Value,
    },

    /// Restore every setting to its default.
    #[serde(rename = "settings.reset")]
    Reset,

    /// The hotkey binding changed.
    #[serde(rename = "settings.toggleDisplayHotkey")]
    ToggleDisplayHotkey,

    /// Diagnostic line, emitted only when the `debug` setting is on.
    #[serde(rename = "debug.log")]
    DebugLog {
        #[serde(default)]
        value: Value,
    },
}

impl Message {
    pub fn get(name: SettingName) -> Self {
        Self::Get {
            name: name.as_str().to_string(),
        }
    }

    pub fn post(name: impl Into<String>, value: Value) -> Self {
        Self::Post {
            name: name.into(),
            value,
        }
    }

    /// The `type` tag as it appears on the wire.
    pub fn type_tag(&self) -> &'static str {
        match self {
            Self::Get { .. } => "settings.get",
            Self::Post { .. } => "settings.post",
            Self::PostAll { .. } => "settings.post-all",
            Self::PostToSdk { .. } => "settings.post-to-sdk",
            Self::Reset => "settings.reset",
            Self::ToggleDisplayHotkey => "settings.toggleDisplayHotkey",
            Self::DebugLog { .. } => "debug.log",
        }
    }
}
