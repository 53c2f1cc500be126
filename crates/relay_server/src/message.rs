//! Message and identifier types shared across the relay core.

use std::fmt;

use tokio_tungstenite::tungstenite::{Bytes, Message, Utf8Bytes};
use uuid::Uuid;

/// Unique identifier for a client connection.
///
/// Assigned when the WebSocket upgrade succeeds and used everywhere the hub
/// or the pumps need to refer to a connection without owning its transport.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh connection identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// An opaque message payload.
///
/// The relay imposes no structure on what clients send; it only preserves the
/// WebSocket frame kind so a relayed message is byte-identical on the wire.
/// Both variants are reference-counted buffers, so cloning one per recipient
/// during fan-out is cheap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// A text frame. Guaranteed valid UTF-8 by the protocol layer.
    Text(Utf8Bytes),
    /// A binary frame.
    Binary(Bytes),
}

impl Payload {
    /// The raw bytes of the payload, regardless of frame kind.
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(bytes) => bytes,
        }
    }

    /// Number of payload bytes.
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload carries no bytes.
    pub fn is_empty(&self) -> bool {
        self.as_bytes().is_empty()
    }

    /// Converts the payload back into a wire frame of the original kind.
    pub(crate) fn into_message(self) -> Message {
        match self {
            Payload::Text(text) => Message::Text(text),
            Payload::Binary(bytes) => Message::Binary(bytes),
        }
    }

    /// Extracts a payload from an inbound frame.
    ///
    /// Returns `None` for control frames (ping/pong/close), which the relay
    /// does not redistribute.
    pub(crate) fn from_message(message: Message) -> Option<Self> {
        match message {
            Message::Text(text) => Some(Payload::Text(text)),
            Message::Binary(bytes) => Some(Payload::Binary(bytes)),
            _ => None,
        }
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.into())
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Binary(bytes.into())
    }
}

/// A message paired with the identity of the connection that sent it,
/// submitted to the hub by a read pump.
#[derive(Debug, Clone)]
pub struct BroadcastRequest {
    /// The connection that originated the message. Never receives its own
    /// message back.
    pub origin: ConnectionId,
    /// The payload to fan out.
    pub payload: Payload,
}
