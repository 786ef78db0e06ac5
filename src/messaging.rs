//! Messaging Channel collaborator.
//!
//! Each attached container gets an asynchronous, origin-scoped message
//! channel established by a handshake the transport owns.  The
//! orchestrator consumes the channel through two seams: [`StoryChannel`]
//! for outbound requests and an inbound [`InboundMessage`] stream pumped
//! into its handlers.  Handshakes are memoized per attach cycle via a
//! [`Shared`] future so concurrent callers share one exchange.

use std::sync::Arc;

use async_trait::async_trait;
use futures::future::{BoxFuture, Shared};
use serde_json::Value;
use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::protocol::{InboundMessage, Request};
use crate::host::ContainerId;

/// Transport-level channel failures.  Reported and degraded, never fatal
/// to the player.
#[derive(Debug, Clone, Error)]
pub enum ChannelError {
    #[error("handshake with embedded document failed: {0}")]
    Handshake(String),
    #[error("channel closed")]
    Closed,
    #[error("request {name} failed: {reason}")]
    Request { name: String, reason: String },
}

/// Outbound side of an established channel.
#[async_trait]
pub trait StoryChannel: Send + Sync {
    /// Send a named request.  When `expects_response` is false the
    /// returned value is `Value::Null`.
    async fn send_request(
        &self,
        name: &str,
        payload: Value,
        expects_response: bool,
    ) -> Result<Value, ChannelError>;
}

/// Convenience wrapper sending a typed [`Request`].
pub async fn send(channel: &dyn StoryChannel, request: &Request) -> Result<Value, ChannelError> {
    channel
        .send_request(request.name(), request.payload(), request.expects_response())
        .await
}

/// A completed handshake: the request side plus the stream of messages
/// pushed by the embedded document.
pub struct ChannelConnection {
    pub channel: Arc<dyn StoryChannel>,
    pub inbound: mpsc::UnboundedReceiver<InboundMessage>,
}

/// Performs the handshake with the embedded context hosted by a
/// container.
#[async_trait]
pub trait ChannelFactory: Send + Sync {
    async fn open(
        &self,
        container: ContainerId,
        url: &str,
    ) -> Result<ChannelConnection, ChannelError>;
}

/// Memoized handshake slot, one per attach cycle.  Detaching a record
/// drops the slot; the next attach creates a fresh one.
pub(crate) type SharedHandshake =
    Shared<BoxFuture<'static, Result<Arc<dyn StoryChannel>, ChannelError>>>;
