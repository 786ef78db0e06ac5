//! Traits the embedding application implements.
//!
//! The orchestrator never touches a real document tree.  It drives three
//! narrow seams: container lifecycle ([`ContainerHost`]), host-page
//! scrolling ([`ScrollSurface`]) and approach-to-viewport observation
//! ([`ViewportProbe`]).  Implementations are expected to coalesce style
//! mutations (position, drag) to frame boundaries; the orchestrator treats
//! them as cheap hints.

use futures::future::BoxFuture;

// ───────────────────────────────────────── containers ────────

/// Opaque handle to one embedded-document container.
pub type ContainerId = usize;

/// Where a container sits relative to the current story.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StoryPosition {
    Previous,
    Current,
    Next,
}

impl StoryPosition {
    /// Signed offset used by attribute-keyed positioning.
    pub fn offset(self) -> i8 {
        match self {
            StoryPosition::Previous => -1,
            StoryPosition::Current => 0,
            StoryPosition::Next => 1,
        }
    }
}

/// Live-drag styling applied while a horizontal gesture is in flight.
///
/// The sign of `delta_px` encodes which side the follower enters from:
/// negative deltas drag the next story in from the right, positive deltas
/// the previous one in from the left.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DragStyle {
    /// The current container, translated by the raw delta.
    Lead { delta_px: f64 },
    /// The adjacent container, offset by a full container width toward
    /// its side plus the raw delta.
    Follow { delta_px: f64 },
}

/// Lifecycle and styling of embedded-document containers.
pub trait ContainerHost: Send + Sync {
    /// Create a container for a story.  The container starts detached and
    /// without a source; `poster_image` is shown until first paint.
    fn create(&self, story_url: &str, poster_image: Option<&str>) -> ContainerId;

    /// Insert the container into the visible tree.
    fn attach(&self, id: ContainerId);

    /// Remove the container from the visible tree and release its
    /// document.  The id must not be reused afterwards.
    fn detach(&self, id: ContainerId);

    fn set_source(&self, id: ContainerId, url: &str);
    fn source(&self, id: ContainerId) -> Option<String>;
    fn set_title(&self, id: ContainerId, title: &str);

    /// Position the container as previous/current/next.  Also clears any
    /// in-flight drag styling.
    fn set_position(&self, id: ContainerId, position: StoryPosition);

    fn apply_drag(&self, id: ContainerId, style: DragStyle);

    /// Reset transform and transition after an aborted drag.
    fn clear_drag(&self, id: ContainerId);

    /// Suppress navigation transitions on every container for exactly one
    /// transition-end cycle (used by non-animated `show()`).  Host-level:
    /// the destination may not have a container yet when a far jump
    /// starts.
    fn suppress_next_transition(&self);

    /// Move input focus into the container.  Best effort.
    fn focus(&self, id: ContainerId);
}

// ───────────────────────────────────────── page scroll ───────

/// Host-page scroll access for the momentum scroller.
pub trait ScrollSurface: Send + Sync {
    fn scroll_top(&self) -> f64;
    fn scroll_to(&self, top: f64);
    fn viewport_height(&self) -> f64;
}

// ───────────────────────────────────────── viewport ──────────

/// Approach-to-viewport observation for the player's root element.
pub trait ViewportProbe: Send + Sync {
    /// Native one-shot subscription: resolves once the element is within
    /// `margin_px` of the visible viewport.  `None` when the platform has
    /// no intersection primitive, in which case the detector falls back
    /// to polling [`ViewportProbe::is_near_viewport`].
    fn subscribe(&self, margin_px: f64) -> Option<BoxFuture<'static, ()>>;

    /// Polled fallback: is the element currently within `margin_px` of
    /// the viewport?
    fn is_near_viewport(&self, margin_px: f64) -> bool;
}
