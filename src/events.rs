//! Host-level events dispatched by the player.
//!
//! Events are delivered over an unbounded channel handed out at
//! construction, so the embedding application consumes them from its own
//! loop without blocking the orchestrator.

use crate::core::protocol::TouchEvent;

/// Events observable by the embedding application.
#[derive(Debug, Clone, PartialEq)]
pub enum PlayerEvent {
    /// The player finished building.
    Ready,
    /// The current story changed.
    Navigation { index: usize, remaining: usize },
    /// A forward navigation was attempted past the last story.
    NoNextStory,
    /// A backward navigation was attempted before the first story.
    NoPreviousStory,
    PageAttachmentOpen,
    PageAttachmentClose,
    /// The current story moved to a new page.
    StoryNavigation { page_id: String, progress: f64 },
    /// The current story reported a mute toggle.
    MutedState { muted: bool },
    /// Raw touch mirrors, re-dispatched for host-level listeners.
    /// `navigational` is the axis classification at the time of dispatch
    /// (`None` while still sampling).
    TouchStart { event: TouchEvent },
    TouchMove {
        event: TouchEvent,
        navigational: Option<bool>,
    },
    TouchEnd {
        event: TouchEvent,
        navigational: Option<bool>,
    },
    /// Free-form event forwarded verbatim from an embedded document.
    Custom { name: String },
}
