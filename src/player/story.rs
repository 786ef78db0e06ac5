//! Story records – one per embedded document in the deck.
//!
//! Records live in a flat `Vec` and reference each other by index, like
//! an arena: indices are contiguous, unique, and never renumbered once
//! assigned.  Records are never deleted, only cycled through
//! attached/detached states as the prefetch window slides over them.

use serde::Deserialize;
use url::Url;

use crate::core::signal::Signal;
use crate::error::PlayerError;
use crate::host::ContainerId;
use crate::messaging::SharedHandshake;

// ───────────────────────────────────────── entries ───────────

/// A story declared by the author or returned by a fetch endpoint.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoryEntry {
    /// Story document URL.  Must be absolute.
    #[serde(alias = "href")]
    pub url: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub poster_image: Option<String>,
}

impl StoryEntry {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            title: None,
            poster_image: None,
        }
    }

    /// An entry is usable only when its URL is non-empty and absolute.
    pub(crate) fn validate(&self) -> Result<(), PlayerError> {
        if self.url.is_empty() || Url::parse(&self.url).is_err() {
            return Err(PlayerError::MalformedStoryEntry);
        }
        Ok(())
    }
}

// ───────────────────────────────────────── records ───────────

/// One story in the deck.
#[derive(Debug)]
pub(crate) struct StoryRecord {
    /// Identity key; immutable after creation.
    pub url: String,
    /// Position in the ordered sequence; assigned once at append time.
    pub index: usize,
    /// Absolute offset from the current index, recomputed every render.
    pub distance: usize,
    pub title: Option<String>,
    pub poster_image: Option<String>,
    /// Reported asynchronously by the embedded document.
    pub aspect_ratio: Option<f64>,
    /// Owned container; `Some` iff the record is inside the prefetch
    /// window.
    pub container: Option<ContainerId>,
    /// Memoized handshake for the current attach cycle.
    pub handshake: Option<SharedHandshake>,
    /// The document reported its first meaningful paint this attach
    /// cycle.
    pub content_loaded: bool,
    /// Resolves when the container is attached; re-armed on detach.
    pub connected: Signal,
    /// Bumped on every attach/detach so stale continuations can notice.
    pub attach_generation: u64,
}

impl StoryRecord {
    pub fn new(entry: StoryEntry, index: usize, current: usize) -> Self {
        Self {
            url: entry.url,
            index,
            distance: current.abs_diff(index),
            title: entry.title,
            poster_image: entry.poster_image,
            aspect_ratio: None,
            container: None,
            handshake: None,
            content_loaded: false,
            connected: Signal::new(),
            attach_generation: 0,
        }
    }

    pub fn is_attached(&self) -> bool {
        self.container.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entry_validation() {
        assert!(StoryEntry::new("https://pub.example/one").validate().is_ok());
        assert!(matches!(
            StoryEntry::new("").validate(),
            Err(PlayerError::MalformedStoryEntry)
        ));
        assert!(matches!(
            StoryEntry::new("not a url").validate(),
            Err(PlayerError::MalformedStoryEntry)
        ));
    }

    #[test]
    fn fetch_payloads_accept_href_alias() {
        let entries: Vec<StoryEntry> = serde_json::from_str(
            r#"[{"href": "https://pub.example/one", "posterImage": "poster.png"}]"#,
        )
        .unwrap();
        assert_eq!(entries[0].url, "https://pub.example/one");
        assert_eq!(entries[0].poster_image.as_deref(), Some("poster.png"));
    }

    #[test]
    fn new_record_starts_detached_at_computed_distance() {
        let record = StoryRecord::new(StoryEntry::new("https://pub.example/one"), 4, 1);
        assert_eq!(record.distance, 3);
        assert!(!record.is_attached());
        assert!(!record.content_loaded);
    }
}
