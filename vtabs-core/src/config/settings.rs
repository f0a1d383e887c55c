//! Recognized extension settings.
//!
//! The table in [`SettingName`] is the single source of truth for which names
//! exist, what type each value has, and what its default is.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

// =============================================================================
// Setting Names
// =============================================================================

/// One of the fixed set of settings the extension understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SettingName {
    /// Show the tab list on the right side of the window.
    Right,
    /// Hide the tab list while the browser is fullscreen.
    HideInFullscreen,
    /// Compact tab rows.
    Compact,
    /// UI theme name.
    Theme,
    /// Where the tab toolbar sits ("top" or "bottom").
    TabtoolbarPosition,
    /// Hotkey that toggles the tab list.
    ToggleDisplayHotkey,
    /// Tab list width in pixels.
    Width,
    /// Gate for peer diagnostic output.
    Debug,
}

impl SettingName {
    /// All recognized settings, in table order.
    pub const ALL: [SettingName; 8] = [
        Self::Right,
        Self::HideInFullscreen,
        Self::Compact,
        Self::Theme,
        Self::TabtoolbarPosition,
        Self::ToggleDisplayHotkey,
        Self::Width,
        Self::Debug,
    ];

    /// Name used on the wire and as the storage key.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Right => "right",
            Self::HideInFullscreen => "hideInFullscreen",
            Self::Compact => "compact",
            Self::Theme => "theme",
            Self::TabtoolbarPosition => "tabtoolbarPosition",
            Self::ToggleDisplayHotkey => "toggleDisplayHotkey",
            Self::Width => "width",
            Self::Debug => "debug",
        }
    }

    /// Look up a recognized setting by its wire name.
    pub fn parse(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|n| n.as_str() == name)
    }

    /// Expected value type.
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Right | Self::HideInFullscreen | Self::Compact | Self::Debug => ValueKind::Bool,
            Self::Theme | Self::TabtoolbarPosition | Self::ToggleDisplayHotkey => ValueKind::Text,
            Self::Width => ValueKind::Integer,
        }
    }

    /// Default value used when nothing has been stored yet.
    pub fn default_value(&self) -> SettingValue {
        match self {
            Self::Right => SettingValue::Bool(false),
            Self::HideInFullscreen => SettingValue::Bool(true),
            Self::Compact => SettingValue::Bool(false),
            Self::Theme => SettingValue::Text("dark".to_string()),
            Self::TabtoolbarPosition => SettingValue::Text("top".to_string()),
            Self::ToggleDisplayHotkey => SettingValue::Text("control-alt-v".to_string()),
            Self::Width => SettingValue::Integer(250),
            Self::Debug => SettingValue::Bool(false),
        }
    }
}

impl std::fmt::Display for SettingName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Setting Values
// =============================================================================

/// Scalar type of a setting.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Text,
    Integer,
}

/// A setting value. Serialized as the bare JSON scalar.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SettingValue {
    Bool(bool),
    Integer(i64),
    Text(String),
}

impl SettingValue {
    /// Decode a JSON value, accepting it only if it matches `kind`.
    pub fn from_json(kind: ValueKind, value: &Value) -> Option<Self> {
        match (kind, value) {
            (ValueKind::Bool, Value::Bool(b)) => Some(Self::Bool(*b)),
            (ValueKind::Text, Value::String(s)) => Some(Self::Text(s.clone())),
            (ValueKind::Integer, Value::Number(n)) => n.as_i64().map(Self::Integer),
            _ => None,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Bool(b) => Value::Bool(*b),
            Self::Integer(i) => Value::from(*i),
            Self::Text(s) => Value::String(s.clone()),
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Integer(_) => ValueKind::Integer,
            Self::Text(_) => ValueKind::Text,
        }
    }
}

// =============================================================================
// Typed Snapshot
// =============================================================================

/// Typed view of every recognized setting with defaults applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub right: bool,
    pub hide_in_fullscreen: bool,
    pub compact: bool,
    pub theme: String,
    pub tabtoolbar_position: String,
    pub toggle_display_hotkey: String,
    pub width: i64,
    pub debug: bool,
}

impl Default for Settings {
    fn default() -> Self {
        Self::from_map(&Map::new())
    }
}

impl Settings {
    /// Build a snapshot from a stored mapping.
    ///
    /// Absent names fall back to their defaults. A stored value of the wrong
    /// type also falls back, with a warning.
    pub fn from_map(stored: &Map<String, Value>) -> Self {
        let pick = |name: SettingName| -> SettingValue {
            match stored.get(name.as_str()) {
                None => name.default_value(),
                Some(raw) => SettingValue::from_json(name.kind(), raw).unwrap_or_else(|| {
                    tracing::warn!(setting = %name, value = %raw, "Stored value has wrong type, using default");
                    name.default_value()
                }),
            }
        };

        let as_bool = |v: SettingValue| matches!(v, SettingValue::Bool(true));
        let as_text = |v: SettingValue| match v {
            SettingValue::Text(s) => s,
            other => other.to_json().to_string(),
        };
        let as_int = |v: SettingValue| match v {
            SettingValue::Integer(i) => i,
            _ => 0,
        };

        Self {
            right: as_bool(pick(SettingName::Right)),
            hide_in_fullscreen: as_bool(pick(SettingName::HideInFullscreen)),
            compact: as_bool(pick(SettingName::Compact)),
            theme: as_text(pick(SettingName::Theme)),
            tabtoolbar_position: as_text(pick(SettingName::TabtoolbarPosition)),
            toggle_display_hotkey: as_text(pick(SettingName::ToggleDisplayHotkey)),
            width: as_int(pick(SettingName::Width)),
            debug: as_bool(pick(SettingName::Debug)),
        }
    }

    /// The full mapping of defaults, keyed by wire name.
    pub fn default_map() -> Map<String, Value> {
        SettingName::ALL
            .iter()
            .map(|n| (n.as_str().to_string(), n.default_value().to_json()))
            .collect()
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_roundtrips_every_name() {
        for name in SettingName::ALL {
            assert_eq!(SettingName::parse(name.as_str()), Some(name));
        }
    }

    #[test]
    fn test_parse_rejects_unknown_and_wrong_case() {
        assert_eq!(SettingName::parse("fontSize"), None);
        assert_eq!(SettingName::parse("Width"), None);
        assert_eq!(SettingName::parse(""), None);
    }

    #[test]
    fn test_defaults_table() {
        assert_eq!(SettingName::Right.default_value(), SettingValue::Bool(false));
        assert_eq!(SettingName::HideInFullscreen.default_value(), SettingValue::Bool(true));
        assert_eq!(SettingName::Compact.default_value(), SettingValue::Bool(false));
        assert_eq!(SettingName::Theme.default_value(), SettingValue::Text("dark".to_string()));
        assert_eq!(SettingName::TabtoolbarPosition.default_value(), SettingValue::Text("top".to_string()));
        assert_eq!(
            SettingName::ToggleDisplayHotkey.default_value(),
            SettingValue::Text("control-alt-v".to_string())
        );
        assert_eq!(SettingName::Width.default_value(), SettingValue::Integer(250));
        assert_eq!(SettingName::Debug.default_value(), SettingValue::Bool(false));
    }

    #[test]
    fn test_default_kind_matches_declared_kind() {
        for name in SettingName::ALL {
            assert_eq!(name.default_value().kind(), name.kind(), "{name}");
        }
    }

    #[test]
    fn test_value_serializes_as_bare_scalar() {
        assert_eq!(serde_json::to_value(SettingValue::Bool(true)).unwrap(), json!(true));
        assert_eq!(serde_json::to_value(SettingValue::Integer(250)).unwrap(), json!(250));
        assert_eq!(serde_json::to_value(SettingValue::Text("dark".to_string())).unwrap(), json!("dark"));
    }

    #[test]
    fn test_from_json_checks_kind() {
        assert_eq!(
            SettingValue::from_json(ValueKind::Integer, &json!(300)),
            Some(SettingValue::Integer(300))
        );
        assert_eq!(SettingValue::from_json(ValueKind::Integer, &json!("300")), None);
        assert_eq!(SettingValue::from_json(ValueKind::Bool, &json!(1)), None);
        assert_eq!(SettingValue::from_json(ValueKind::Integer, &json!(2.5)), None);
    }

    #[test]
    fn test_snapshot_defaults() {
        let settings = Settings::default();
        assert!(!settings.right);
        assert!(settings.hide_in_fullscreen);
        assert!(!settings.compact);
        assert_eq!(settings.theme, "dark");
        assert_eq!(settings.tabtoolbar_position, "top");
        assert_eq!(settings.toggle_display_hotkey, "control-alt-v");
        assert_eq!(settings.width, 250);
        assert!(!settings.debug);
    }

    #[test]
    fn test_snapshot_uses_stored_values() {
        let mut stored = Map::new();
        stored.insert("theme".into(), json!("light"));
        stored.insert("width".into(), json!(320));
        stored.insert("right".into(), json!(true));

        let settings = Settings::from_map(&stored);
        assert_eq!(settings.theme, "light");
        assert_eq!(settings.width, 320);
        assert!(settings.right);
        assert!(settings.hide_in_fullscreen);
    }

    #[test]
    fn test_snapshot_falls_back_on_wrong_type() {
        let mut stored = Map::new();
        stored.insert("width".into(), json!("wide"));

        let settings = Settings::from_map(&stored);
        assert_eq!(settings.width, 250);
    }

    #[test]
    fn test_default_map_has_every_name() {
        let map = Settings::default_map();
        assert_eq!(map.len(), SettingName::ALL.len());
        assert_eq!(map["width"], json!(250));
        assert_eq!(map["hideInFullscreen"], json!(true));
    }
}
