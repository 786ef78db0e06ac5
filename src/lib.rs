//! An embeddable deck-of-stories player, headless.
//!
//! The orchestrator keeps a sliding window of embedded story documents
//! attached around the current one, talks to each document over an async
//! message channel, and turns raw touch input into story navigation or
//! host-page momentum scrolling.  Everything platform-specific is behind
//! the traits in [`host`], [`messaging`] and [`fetch`]; the embedding
//! application implements those and consumes [`events::PlayerEvent`]s.
//!
//! ```no_run
//! # use std::sync::Arc;
//! # use storydeck::config::PlayerConfig;
//! # use storydeck::player::{PlayerDeps, PlayerOptions, StoryEntry, StoryPlayer};
//! # async fn example(deps: PlayerDeps) -> anyhow::Result<()> {
//! let entries = vec![
//!     StoryEntry::new("https://pub.example/stories/one"),
//!     StoryEntry::new("https://pub.example/stories/two"),
//! ];
//! let (player, mut events) =
//!     StoryPlayer::new(deps, PlayerOptions::default(), PlayerConfig::default(), entries)?;
//! player.wait_until_interactive().await;
//! player.next().await;
//! while let Some(event) = events.recv().await {
//!     println!("{event:?}");
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod events;
pub mod fetch;
pub mod host;
pub mod messaging;
pub mod player;

pub use config::PlayerConfig;
pub use error::PlayerError;
pub use events::PlayerEvent;
pub use player::{PlayerDeps, PlayerOptions, StoryEntry, StoryPlayer};
