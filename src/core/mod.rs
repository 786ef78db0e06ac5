//! Core building blocks – message protocol, URL handling, and signals.
//!
//! Nothing in this module touches the orchestrator's state.
//! Every type is `Send + Sync` so it can be shared across async tasks.

pub mod protocol;
pub mod signal;
pub mod url;
