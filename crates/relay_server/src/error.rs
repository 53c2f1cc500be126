//! Error types for the relay server.
//!
//! Per-connection failures (`Transport`, `Overload`) are contained within the
//! failing connection and resolved by unregistration; only `Config` and
//! `Listen` are fatal to the process.

use thiserror::Error;

use crate::message::ConnectionId;

/// Errors that can occur in the relay server.
#[derive(Debug, Error)]
pub enum RelayError {
    /// Configuration file missing or malformed. Fatal; the process exits
    /// with status 1 after logging.
    #[error("Configuration error: {0}")]
    Config(String),

    /// The listening socket could not be bound or served. Fatal; the process
    /// exits with status 1 after logging.
    #[error("Listen error: {0}")]
    Listen(String),

    /// A connection's read or write failed (peer closed, network error,
    /// protocol violation). Local to that connection.
    #[error("Transport error: {0}")]
    Transport(String),

    /// A recipient's outbound queue was full during fan-out. The recipient
    /// is evicted; treated like a transport failure for that connection.
    #[error("Outbound queue full for connection {0}, evicting slow consumer")]
    Overload(ConnectionId),
}
