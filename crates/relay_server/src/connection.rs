//! Per-connection pump pair.
//!
//! Each registered connection runs two independent tasks: a read pump that
//! turns inbound frames into hub broadcast requests, and a write pump that
//! drains the connection's bounded outbound queue to the socket. The pumps
//! exclusively own the two transport halves; the hub only ever holds the
//! outbound queue sender.

use std::net::SocketAddr;

use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::hub::HubHandle;
use crate::message::{BroadcastRequest, ConnectionId, Payload};
use crate::transport::{self, TransportReader, TransportWriter, WsStream};

/// Registers an upgraded connection with the hub and starts its pump pair.
///
/// # Arguments
///
/// * `id` - Identity assigned to this connection
/// * `remote_addr` - Peer address, for logging
/// * `stream` - The upgraded WebSocket stream
/// * `hub` - Handle for registration and broadcast submission
/// * `queue_capacity` - Bound on the outbound queue; a full queue marks the
///   connection as a slow consumer and gets it evicted
pub fn spawn_pumps(
    id: ConnectionId,
    remote_addr: SocketAddr,
    stream: WsStream,
    hub: &HubHandle,
    queue_capacity: usize,
) {
    let (outbound_tx, outbound_rx) = mpsc::channel(queue_capacity);
    let (writer, reader) = transport::split(stream);

    hub.register(id, outbound_tx);
    info!("🔌 Connection {} established from {}", id, remote_addr);

    tokio::spawn(read_pump(id, reader, hub.clone()));
    tokio::spawn(write_pump(id, outbound_rx, writer, hub.clone()));
}

/// Bridges "receive from one peer" to "submit broadcast request to hub".
///
/// Exits permanently on the transport's terminal failure signal, reporting
/// the death to the hub. Unregistration is idempotent, so racing the write
/// pump's own report is harmless.
async fn read_pump(id: ConnectionId, mut reader: TransportReader, hub: HubHandle) {
    while let Some(payload) = reader.recv(id).await {
        debug!("📨 Connection {} relaying {} byte(s)", id, payload.len());
        hub.broadcast(BroadcastRequest {
            origin: id,
            payload,
        });
    }
    hub.unregister(id);
    debug!("Read pump for connection {} stopped", id);
}

/// Bridges "hub-enqueued outbound messages" to "write to one peer".
///
/// Runs until the outbound queue closes (unregistration, eviction, or
/// shutdown) or a write fails. Either way this pump closes the transport -
/// it is the only task that ever does.
async fn write_pump(
    id: ConnectionId,
    mut outbound_rx: mpsc::Receiver<Payload>,
    mut writer: TransportWriter,
    hub: HubHandle,
) {
    while let Some(payload) = outbound_rx.recv().await {
        if let Err(e) = writer.send(payload).await {
            warn!("Connection {} write failed: {}", id, e);
            hub.unregister(id);
            break;
        }
    }
    writer.close(id).await;
    debug!("Write pump for connection {} stopped", id);
}
