// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 Mark Wells <contact@markwells.dev>

//! Default settings schema and backfill.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

use crate::config::EnvironmentDefaults;

/// Version written into every settings document.
pub const SCHEMA_VERSION: u32 = 1;

/// The full default settings document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SettingsSchema {
    /// Schema version of the document.
    pub version: u32,
    /// Main window state.
    pub window: WindowSettings,
    /// Code editor preferences.
    pub editor: EditorSettings,
    /// Assistant provider preferences.
    pub ai: AiSettings,
    /// Project behavior.
    pub project: ProjectSettings,
    /// Integrated terminal.
    pub terminal: TerminalSettings,
}

/// Main window state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WindowSettings {
    /// Width in logical pixels.
    pub width: u32,
    /// Height in logical pixels.
    pub height: u32,
    /// Whether the window starts maximized.
    pub maximized: bool,
    /// Theme name.
    pub theme: String,
}

/// Code editor preferences.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorSettings {
    /// Font size in points.
    pub font_size: u32,
    /// CSS font-family list.
    pub font_family: String,
    /// Spaces per tab.
    pub tab_size: u32,
    /// Soft wrap long lines.
    pub word_wrap: bool,
    /// Show the line-number gutter.
    pub line_numbers: bool,
    /// Show the minimap.
    pub minimap: bool,
}

/// Assistant provider preferences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AiSettings {
    /// Provider configuration keyed by provider name.
    pub providers: Map<String, Value>,
    /// Model used when none is chosen.
    pub default_model: String,
    /// `regular` or a provider-specific mode.
    pub performance_mode: String,
}

/// Project behavior.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Mirrors independent UI toggles"
)]
pub struct ProjectSettings {
    /// Save files on focus change.
    pub auto_save: bool,
    /// Format files on save.
    pub auto_format: bool,
    /// Show dot-files in the explorer.
    pub show_hidden_files: bool,
}

/// Integrated terminal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TerminalSettings {
    /// Font size in points.
    pub font_size: u32,
    /// Shell executable.
    pub shell: String,
}

impl SettingsSchema {
    /// Defaults for this machine. Window geometry and shell come from the
    /// host configuration.
    #[must_use]
    pub fn defaults(env: &EnvironmentDefaults) -> Self {
        Self {
            version: SCHEMA_VERSION,
            window: WindowSettings {
                width: env.window.width,
                height: env.window.height,
                maximized: false,
                theme: "dark".to_string(),
            },
            editor: EditorSettings {
                font_size: 14,
                font_family: "Monaco, Consolas, \"Courier New\", monospace".to_string(),
                tab_size: 2,
                word_wrap: true,
                line_numbers: true,
                minimap: true,
            },
            ai: AiSettings {
                providers: Map::new(),
                default_model: String::new(),
                performance_mode: "regular".to_string(),
            },
            project: ProjectSettings {
                auto_save: true,
                auto_format: true,
                show_hidden_files: false,
            },
            terminal: TerminalSettings {
                font_size: 12,
                shell: env.terminal.shell.clone(),
            },
        }
    }

    /// The schema as a JSON document.
    #[must_use]
    pub fn to_document(&self) -> Value {
        // Plain structs with string keys cannot fail to serialize.
        serde_json::to_value(self).unwrap_or_else(|_| Value::Object(Map::new()))
    }
}

/// Fills every key of `defaults` that `document` lacks. Values already in
/// `document` win, except that a scalar sitting where the schema expects an
/// object is replaced by the default object.
///
/// Returns the number of keys that were filled in.
pub fn backfill(document: &mut Map<String, Value>, defaults: &Map<String, Value>) -> usize {
    let mut filled = 0;
    for (key, default) in defaults {
        match document.get_mut(key) {
            None => {
                document.insert(key.clone(), default.clone());
                filled += 1;
            }
            Some(existing) => match (existing, default) {
                (Value::Object(existing), Value::Object(default)) => {
                    filled += backfill(existing, default);
                }
                (existing, Value::Object(_)) => {
                    warn!(key = %key, "Settings key holds a scalar where the schema expects an object");
                    *existing = default.clone();
                    filled += 1;
                }
                _ => {}
            },
        }
    }
    filled
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn defaults() -> Map<String, Value> {
        match SettingsSchema::defaults(&EnvironmentDefaults::default()).to_document() {
            Value::Object(map) => map,
            _ => Map::new(),
        }
    }

    #[test]
    fn test_defaults_cover_all_sections() {
        let doc = defaults();
        for section in ["window", "editor", "ai", "project", "terminal"] {
            assert!(doc.get(section).is_some_and(Value::is_object), "{section}");
        }
        assert_eq!(doc.get("version"), Some(&json!(SCHEMA_VERSION)));
        assert_eq!(doc["editor"]["fontSize"], json!(14));
        assert_eq!(doc["ai"]["providers"], json!({}));
    }

    #[test]
    fn test_backfill_keeps_user_values() {
        let mut doc = match json!({"editor": {"fontSize": 18}, "custom": {"x": 1}}) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        let filled = backfill(&mut doc, &defaults());

        assert!(filled > 0);
        assert_eq!(doc["editor"]["fontSize"], json!(18));
        assert_eq!(doc["editor"]["tabSize"], json!(2));
        assert_eq!(doc["custom"]["x"], json!(1));
        assert!(doc.contains_key("terminal"));
    }

    #[test]
    fn test_backfill_complete_document_is_noop() {
        let mut doc = defaults();
        assert_eq!(backfill(&mut doc, &defaults()), 0);
        assert_eq!(doc, defaults());
    }

    #[test]
    fn test_backfill_replaces_scalar_section() {
        let mut doc = match json!({"window": 7}) {
            Value::Object(map) => map,
            _ => Map::new(),
        };
        backfill(&mut doc, &defaults());
        assert!(doc["window"].is_object());
    }
}
