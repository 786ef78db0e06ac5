//! Error taxonomy for the player.
//!
//! Structural errors (bad input, out-of-range navigation, unknown story
//! URLs) are raised synchronously to the caller.  Transport problems are
//! logged and degraded in place, never surfaced as panics.  Superseded
//! render chains are signalled with the typed [`Superseded`] marker so
//! consumers can drop them without string-matching error text.

use thiserror::Error;

/// Errors surfaced by the public player API.
#[derive(Debug, Error)]
pub enum PlayerError {
    /// An appended story entry does not expose a resolvable URL.
    #[error("story entry has no resolvable url")]
    MalformedStoryEntry,

    /// Navigation target falls outside `[0, len)` and circular wrapping
    /// is disabled.
    #[error("story delta {delta} is out of range for {len} stories")]
    OutOfRange { delta: i64, len: usize },

    /// A `show()`/`rewind()` URL that matches no known story.
    #[error("story url not found in the player: {url}")]
    StoryNotFound { url: String },

    /// The configured cache host is not a supported CDN proxy.
    #[error("unsupported cache host: {0}")]
    UnsupportedCache(String),

    /// The author-supplied JSON configuration block failed to parse.
    #[error("invalid player configuration: {0}")]
    Config(#[from] serde_json::Error),
}

/// Typed cancellation marker for a stale render chain.
///
/// When a new navigation starts while a "waiting for the current story's
/// first paint" future is still outstanding, the stale future is cancelled
/// with this value.  Render-chain consumers recognise it and bail out
/// quietly; it is never an error condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Superseded;

impl std::fmt::Display for Superseded {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str("superseded by a newer navigation")
    }
}
