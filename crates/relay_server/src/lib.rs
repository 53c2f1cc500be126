//! # Relay Server - Reload Rumble Message Fan-Out Core
//!
//! The relay core for the Reload Rumble multiplayer browser game. Clients hold
//! a persistent WebSocket connection; every message a client sends is
//! redistributed to all other connected clients, best-effort, with low latency.
//!
//! ## Architecture Overview
//!
//! * **Hub** - Single serialized loop owning the live-connection registry and
//!   performing broadcast fan-out. Only the hub loop ever touches the registry,
//!   so no locks are needed.
//! * **Connection pumps** - Each connection runs a read pump (socket → hub)
//!   and a write pump (outbound queue → socket), independent of every other
//!   connection's pumps.
//! * **Transport adapter** - Thin wrapper over a split WebSocket stream; the
//!   relay treats payloads as opaque bytes and never parses HTTP itself.
//! * **Server** - TCP accept loop performing the path-checked WebSocket
//!   upgrade and handing new connections to the hub.
//!
//! ## Message Flow
//!
//! 1. A client upgrades to WebSocket on the configured path
//! 2. The connection registers with the hub and its pump pair starts
//! 3. The read pump turns each inbound frame into a broadcast request
//! 4. The hub enqueues the payload onto every other connection's bounded
//!    outbound queue, without blocking - a full queue evicts that recipient
//! 5. Each write pump drains its queue to its own socket
//!
//! ## Failure Containment
//!
//! A connection's read error, write error, or queue overflow only ever
//! unregisters that connection; other participants keep relaying. Only
//! configuration and listen-socket failures are fatal to the process.

// Re-export core types for easy access
pub use config::{Config, LoggingSettings, ServerSettings};
pub use error::RelayError;
pub use hub::{Hub, HubHandle};
pub use message::{BroadcastRequest, ConnectionId, Payload};
pub use server::RelayServer;
pub use shutdown::ShutdownController;

// Public module declarations
pub mod config;
pub mod error;
pub mod hub;
pub mod logging;
pub mod message;
pub mod server;
pub mod shutdown;

// Internal modules (not part of public API)
mod connection;
mod transport;
