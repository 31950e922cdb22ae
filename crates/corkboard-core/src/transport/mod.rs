//! Pub/sub channel abstraction.
//!
//! A board session talks to its peers through one [`Transport`]: a named
//! topic per board carrying broadcast events, plus a presence registry.
//! Delivery is best effort. Events are collected by the implementation and
//! drained with [`Transport::poll`] from the session's own loop.

mod memory;
pub mod protocol;

#[cfg(not(target_arch = "wasm32"))]
mod ws;

pub use memory::{MemoryHub, MemoryTransport};

#[cfg(not(target_arch = "wasm32"))]
pub use ws::WsTransport;

use serde_json::Value;
use thiserror::Error;

use crate::presence::{PresenceMeta, PresenceState};

/// Transport errors.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Not joined to a board channel")]
    NotConnected,
    #[error("Transport closed")]
    Closed,
    #[error("Failed to encode message: {0}")]
    Encode(String),
    #[error("Connection failed: {0}")]
    Connect(String),
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;

/// Something that happened on the channel since the last poll.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// A peer broadcast `event` with `payload`. Only subscribed events are
    /// delivered.
    Broadcast { event: String, payload: Value },
    /// A connection announced itself.
    PresenceJoin { key: String, metas: Vec<PresenceMeta> },
    /// A connection went away.
    PresenceLeave { key: String, metas: Vec<PresenceMeta> },
    /// The registry was replaced wholesale.
    PresenceSync,
    /// The underlying connection came up.
    Connected,
    /// The underlying connection dropped.
    Disconnected,
    /// The channel reported an error.
    Error { message: String },
}

/// A board's pub/sub channel and presence registry.
pub trait Transport {
    /// Join the channel for `topic` (one per board).
    fn join(&mut self, topic: &str) -> TransportResult<()>;

    /// Leave the current channel, dropping presence and subscriptions.
    fn leave(&mut self) -> TransportResult<()>;

    /// Deliver broadcasts named `event` from now on.
    fn subscribe(&mut self, event: &str);

    /// Stop delivering every broadcast.
    fn unsubscribe_all(&mut self);

    /// Broadcast to every other member of the channel.
    fn send(&mut self, event: &str, payload: Value) -> TransportResult<()>;

    /// Announce this connection's identity in the presence registry.
    fn track(&mut self, meta: PresenceMeta) -> TransportResult<()>;

    /// Withdraw this connection from the presence registry.
    fn untrack(&mut self) -> TransportResult<()>;

    /// Current presence registry of the channel.
    fn presence_state(&self) -> PresenceState;

    /// Drain events received since the last call.
    fn poll(&mut self) -> Vec<ChannelEvent>;

    /// Leave and release the connection. Further calls fail with `Closed`.
    fn close(&mut self);
}
