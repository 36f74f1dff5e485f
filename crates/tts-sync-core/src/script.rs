//! Script state carried by object and load messages

use serde::{Deserialize, Serialize};

/// Extension for script source files
pub const SCRIPT_EXTENSION: &str = "lua";

/// Extension for UI markup files
pub const UI_EXTENSION: &str = "xml";

/// One scriptable game object and its editable content
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScriptState {
    /// Display name, cosmetic only
    pub name: String,
    /// Identity assigned by the game
    pub guid: String,
    /// Lua source, may be empty
    pub script: String,
    /// UI markup; absent or empty means no UI file
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui: Option<String>,
}

impl ScriptState {
    pub fn new(name: impl Into<String>, guid: impl Into<String>, script: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            guid: guid.into(),
            script: script.into(),
            ui: None,
        }
    }

    pub fn with_ui(mut self, ui: impl Into<String>) -> Self {
        self.ui = Some(ui.into());
        self
    }

    /// Filesystem base name, `<name>_<guid>`
    pub fn base_name(&self) -> String {
        base_name(&self.name, &self.guid)
    }

    /// UI markup if present and non-empty
    pub fn ui_content(&self) -> Option<&str> {
        self.ui.as_deref().filter(|ui| !ui.is_empty())
    }
}

/// Derive the file base name for an object.
pub fn base_name(name: &str, guid: &str) -> String {
    format!("{}_{}", name, guid)
}

/// Split a base name back into `(name, guid)`.
///
/// Guids never contain `_`, names may, so the split is on the last one.
pub fn split_base_name(base: &str) -> Option<(&str, &str)> {
    match base.rsplit_once('_') {
        Some((name, guid)) if !guid.is_empty() => Some((name, guid)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_name_is_deterministic() {
        let state = ScriptState::new("Card", "abc123", "print('hi')");
        assert_eq!(state.base_name(), "Card_abc123");
        assert_eq!(state.base_name(), base_name("Card", "abc123"));
    }

    #[test]
    fn test_split_keeps_underscores_in_name() {
        assert_eq!(split_base_name("Deck_of_Cards_a1b2c3"), Some(("Deck_of_Cards", "a1b2c3")));
        assert_eq!(split_base_name("_-1"), Some(("", "-1")));
        assert_eq!(split_base_name("nounderscore"), None);
        assert_eq!(split_base_name("trailing_"), None);
    }

    #[test]
    fn test_empty_ui_is_treated_as_absent() {
        let state = ScriptState::new("Board", "ff00ff", "").with_ui("");
        assert_eq!(state.ui_content(), None);

        let state = state.with_ui("<Panel/>");
        assert_eq!(state.ui_content(), Some("<Panel/>"));
    }

    #[test]
    fn test_ui_field_is_optional_on_the_wire() {
        let json = r#"{"name":"Global","guid":"-1","script":"function onLoad() end"}"#;
        let state: ScriptState = serde_json::from_str(json).unwrap();
        assert_eq!(state.guid, "-1");
        assert!(state.ui.is_none());

        let out = serde_json::to_string(&state).unwrap();
        assert!(!out.contains("\"ui\""), "{}", out);
    }
}
