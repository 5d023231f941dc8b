//! Serializable snapshots of a field's token set.
//!
//! A snapshot stores display labels plus each item's self-chosen recipe
//! (see [`TagItem::save`](crate::item::TagItem::save)). Restoring goes
//! through the factory: recipes first, label re-materialization as the
//! fallback, and entries that survive neither are dropped.

use serde::{Deserialize, Serialize};

/// One saved token.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedToken {
    pub label: String,
    #[serde(default)]
    pub read_only: bool,
    /// Factory-specific reconstruction data, when the item provides any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recipe: Option<serde_json::Value>,
}

/// A whole field: tokens in display order, uncommitted text, and the
/// presentation flags needed to rebuild the field as the user left it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SavedState {
    #[serde(default)]
    pub tokens: Vec<SavedToken>,
    /// Free text that was not yet a token when the snapshot was taken.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub composing: String,
    #[serde(default)]
    pub read_only: bool,
    #[serde(default = "default_collapsed")]
    pub collapsed: bool,
    #[serde(default = "default_max_visible")]
    pub max_visible: i32,
}

impl Default for SavedState {
    fn default() -> Self {
        Self {
            tokens: Vec::new(),
            composing: String::new(),
            read_only: false,
            collapsed: true,
            max_visible: -1,
        }
    }
}

impl SavedState {
    /// Serialize the snapshot to a JSON string.
    pub fn to_json(&self) -> tagline_core::Result<String> {
        serde_json::to_string(self)
            .map_err(|e| tagline_core::TaglineError::invalid_configuration(e.to_string()))
    }

    /// Parse a snapshot previously produced by [`SavedState::to_json`].
    pub fn from_json(json: &str) -> tagline_core::Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| tagline_core::TaglineError::invalid_configuration(e.to_string()))
    }
}

fn default_collapsed() -> bool {
    true
}

fn default_max_visible() -> i32 {
    -1
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trips_through_json() {
        let state = SavedState {
            tokens: vec![
                SavedToken {
                    label: "Ada <ada@x.io>".into(),
                    read_only: true,
                    recipe: Some(serde_json::json!({"email": "ada@x.io"})),
                },
                SavedToken {
                    label: "bob@x.io".into(),
                    read_only: false,
                    recipe: None,
                },
            ],
            composing: "car".into(),
            read_only: false,
            collapsed: true,
            max_visible: 2,
        };
        let json = state.to_json().unwrap();
        let back = SavedState::from_json(&json).unwrap();
        assert_eq!(back.tokens.len(), 2);
        assert_eq!(back.tokens[0].label, "Ada <ada@x.io>");
        assert!(back.tokens[0].read_only);
        assert!(back.tokens[1].recipe.is_none());
        assert_eq!(back.composing, "car");
        assert_eq!(back.max_visible, 2);
    }

    #[test]
    fn test_malformed_json_is_rejected() {
        assert!(SavedState::from_json("{not json").is_err());
    }

    #[test]
    fn test_missing_fields_default() {
        let back: SavedState = serde_json::from_str(r#"{"tokens":[{"label":"x@y.io"}]}"#).unwrap();
        assert_eq!(back.tokens.len(), 1);
        assert!(!back.tokens[0].read_only);
        assert!(back.composing.is_empty());
        assert!(back.collapsed);
        assert_eq!(back.max_visible, -1);
    }
}
