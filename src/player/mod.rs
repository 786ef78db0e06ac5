//! Player orchestration — story records, gestures, physics, and the deck
//! orchestrator itself.

pub mod gesture;
pub mod orchestrator;
pub mod scroller;
pub mod story;
pub mod viewport;

pub use orchestrator::{PlayerDeps, PlayerOptions, StoryPlayer};
pub use scroller::ScrollerTuning;
pub use story::StoryEntry;
pub use viewport::ArrivalTuning;
