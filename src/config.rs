//! Author-supplied player configuration.
//!
//! The configuration block is a JSON document with three sections:
//! `behavior` (end-of-deck action, autoplay, page scroll), `display`
//! (attribution) and `controls` (custom viewer chrome forwarded to each
//! embedded document).  Policy flags are derived lazily by the
//! orchestrator; this module only parses and answers questions.

use serde::{Deserialize, Serialize};

use crate::error::PlayerError;

// ───────────────────────────────────────── sections ──────────

/// `behavior` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Behavior {
    /// Trigger for `action`, e.g. `"end"`.
    pub on: Option<String>,
    /// `"fetch"` or `"circular-wrapping"`.
    pub action: Option<String>,
    /// Fetch endpoint template; `${offset}` is replaced by the current
    /// story count.
    pub endpoint: Option<String>,
    pub autoplay: Option<bool>,
    pub page_scroll: Option<bool>,
}

impl Behavior {
    /// A behavior is well-formed when both trigger and action are present.
    fn is_valid(&self) -> bool {
        self.on.is_some() && self.action.is_some()
    }

    fn is(&self, on: &str, action: &str) -> bool {
        self.is_valid()
            && self.on.as_deref() == Some(on)
            && self.action.as_deref() == Some(action)
    }
}

/// `display` section.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Display {
    pub attribution: Option<String>,
}

/// One custom control forwarded to embedded documents via
/// `customDocumentUI`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ViewerControl {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub state: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub visibility: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub position: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub background_image_url: Option<String>,
}

// ───────────────────────────────────────── config root ───────

/// Parsed player configuration block.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    pub behavior: Option<Behavior>,
    pub display: Option<Display>,
    pub controls: Option<Vec<ViewerControl>>,
}

impl PlayerConfig {
    /// Parse the raw JSON configuration block.
    pub fn from_json(raw: &str) -> Result<Self, PlayerError> {
        Ok(serde_json::from_str(raw)?)
    }

    /// `behavior.on = end, action = circular-wrapping`.
    pub fn circular_wrapping(&self) -> bool {
        self.behavior
            .as_ref()
            .is_some_and(|b| b.is("end", "circular-wrapping"))
    }

    /// Endpoint for fetch-on-end, when configured and well-formed.
    pub fn fetch_endpoint(&self) -> Option<&str> {
        let behavior = self.behavior.as_ref()?;
        if behavior.is("end", "fetch") {
            behavior.endpoint.as_deref()
        } else {
            None
        }
    }

    /// Whether playback starts automatically.  Defaults to on.
    pub fn autoplay(&self) -> bool {
        self.behavior
            .as_ref()
            .and_then(|b| b.autoplay)
            .unwrap_or(true)
    }

    /// Whether vertical drags scroll the host page.  Defaults to on.
    pub fn page_scroll(&self) -> bool {
        self.behavior
            .as_ref()
            .and_then(|b| b.page_scroll)
            .unwrap_or(true)
    }

    /// `display.attribution = auto`.
    pub fn attribution_auto(&self) -> bool {
        self.display
            .as_ref()
            .is_some_and(|d| d.attribution.as_deref() == Some("auto"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_full_block() {
        let config = PlayerConfig::from_json(
            r#"{
                "behavior": {
                    "on": "end",
                    "action": "fetch",
                    "endpoint": "https://feed.example/stories?from=${offset}",
                    "autoplay": false,
                    "pageScroll": false
                },
                "display": {"attribution": "auto"},
                "controls": [{"name": "skip-to-next"}]
            }"#,
        )
        .unwrap();

        assert_eq!(
            config.fetch_endpoint(),
            Some("https://feed.example/stories?from=${offset}")
        );
        assert!(!config.autoplay());
        assert!(!config.page_scroll());
        assert!(config.attribution_auto());
        assert!(!config.circular_wrapping());
        assert_eq!(config.controls.as_ref().unwrap().len(), 1);
    }

    #[test]
    fn circular_wrapping_needs_matching_trigger() {
        let config = PlayerConfig::from_json(
            r#"{"behavior": {"on": "end", "action": "circular-wrapping"}}"#,
        )
        .unwrap();
        assert!(config.circular_wrapping());
        assert_eq!(config.fetch_endpoint(), None);

        let config =
            PlayerConfig::from_json(r#"{"behavior": {"action": "circular-wrapping"}}"#).unwrap();
        assert!(!config.circular_wrapping());
    }

    #[test]
    fn empty_block_defaults() {
        let config = PlayerConfig::from_json("{}").unwrap();
        assert!(config.autoplay());
        assert!(config.page_scroll());
        assert!(!config.circular_wrapping());
        assert_eq!(config.fetch_endpoint(), None);
    }

    #[test]
    fn malformed_json_is_a_config_error() {
        assert!(matches!(
            PlayerConfig::from_json("{nope"),
            Err(PlayerError::Config(_))
        ));
    }
}
