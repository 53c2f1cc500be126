//! Connection adapter over a split WebSocket stream.
//!
//! Wraps the two halves of an upgraded connection so the pumps deal in
//! opaque [`Payload`]s instead of wire frames. The adapter performs no I/O
//! beyond the underlying transport; ping/pong and close replies are handled
//! by the protocol layer.

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::{tungstenite::Message, WebSocketStream};
use tracing::debug;

use crate::error::RelayError;
use crate::message::{ConnectionId, Payload};

/// Type alias for an upgraded server-side WebSocket stream.
pub type WsStream = WebSocketStream<TcpStream>;

/// Splits an upgraded stream into the adapter halves the pump pair owns.
pub fn split(stream: WsStream) -> (TransportWriter, TransportReader) {
    let (sink, stream) = stream.split();
    (TransportWriter { sink }, TransportReader { stream })
}

/// Receiving half of a connection's transport. Exclusively owned by the
/// connection's read pump.
pub struct TransportReader {
    stream: SplitStream<WsStream>,
}

/// Sending half of a connection's transport. Exclusively owned by the
/// connection's write pump, which is the only place the transport is closed.
pub struct TransportWriter {
    sink: SplitSink<WsStream, Message>,
}

impl TransportReader {
    /// Waits for the next payload from the peer.
    ///
    /// Yields a lazy, finite, non-restartable sequence: `None` is the
    /// terminal failure signal, covering peer close, protocol violation,
    /// and network errors alike. Control frames are skipped.
    pub async fn recv(&mut self, id: ConnectionId) -> Option<Payload> {
        while let Some(frame) = self.stream.next().await {
            match frame {
                Ok(Message::Close(_)) => {
                    debug!("Connection {} requested close", id);
                    return None;
                }
                Ok(message) => {
                    if let Some(payload) = Payload::from_message(message) {
                        return Some(payload);
                    }
                    // Ping/pong keepalive traffic, not relayed.
                }
                Err(e) => {
                    debug!("Connection {} read failed: {}", id, e);
                    return None;
                }
            }
        }
        None
    }
}

impl TransportWriter {
    /// Writes one payload to the peer.
    pub async fn send(&mut self, payload: Payload) -> Result<(), RelayError> {
        self.sink
            .send(payload.into_message())
            .await
            .map_err(|e| RelayError::Transport(e.to_string()))
    }

    /// Closes the transport, consuming the writer.
    ///
    /// Ownership makes "closed exactly once" structural: whichever teardown
    /// path runs, the writer can only be consumed here. Failures are ignored
    /// because the peer may already be gone.
    pub async fn close(mut self, id: ConnectionId) {
        let _ = self.sink.send(Message::Close(None)).await;
        let _ = self.sink.close().await;
        debug!("Connection {} transport closed", id);
    }
}
