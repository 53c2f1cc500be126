//! Relay server listener and upgrade endpoint.
//!
//! Binds the TCP listener, runs the accept loop, and performs the WebSocket
//! upgrade handshake for incoming connections. The handshake itself is
//! delegated to the protocol layer; the relay only checks that the request
//! targets the configured upgrade path before handing the connection to the
//! hub.

use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::StatusCode;
use tracing::{info, warn};

use crate::config::Config;
use crate::connection;
use crate::error::RelayError;
use crate::hub::HubHandle;
use crate::message::ConnectionId;
use crate::shutdown::ShutdownController;

/// The relay's listening socket plus everything an accepted connection needs.
pub struct RelayServer {
    listener: TcpListener,
    hub: HubHandle,
    shutdown: ShutdownController,
    upgrade_path: String,
    queue_capacity: usize,
}

impl RelayServer {
    /// Binds the listening socket.
    ///
    /// # Arguments
    ///
    /// * `config` - Listen address, upgrade path, and queue capacity
    /// * `hub` - Handle new connections register through
    /// * `shutdown` - Shutdown signal that stops the accept loop
    ///
    /// # Errors
    ///
    /// [`RelayError::Listen`] if the address cannot be bound; the binary
    /// treats this as fatal (exit status 1).
    pub async fn bind(
        config: &Config,
        hub: HubHandle,
        shutdown: ShutdownController,
    ) -> Result<Self, RelayError> {
        let addr = config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|e| RelayError::Listen(format!("bind {}: {}", addr, e)))?;

        Ok(Self {
            listener,
            hub,
            shutdown,
            upgrade_path: config.server.upgrade_path.clone(),
            queue_capacity: config.server.outbound_queue_capacity,
        })
    }

    /// The address actually bound, useful when the configured port is 0.
    pub fn local_addr(&self) -> Result<SocketAddr, RelayError> {
        self.listener
            .local_addr()
            .map_err(|e| RelayError::Listen(e.to_string()))
    }

    /// Runs the accept loop until a shutdown signal or a listener failure.
    ///
    /// Each accepted stream is handed to its own task for the upgrade
    /// handshake, so a slow or malformed handshake never stalls the loop.
    /// On shutdown the loop stops first - no new registrations - and the hub
    /// then drains existing connections.
    pub async fn serve(self) -> Result<(), RelayError> {
        let mut shutdown_rx = self.shutdown.subscribe();
        info!(
            "🎮 Accepting connections on {} (upgrade path {})",
            self.local_addr()?,
            self.upgrade_path
        );

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    match accepted {
                        Ok((stream, addr)) => {
                            let hub = self.hub.clone();
                            let upgrade_path = self.upgrade_path.clone();
                            let queue_capacity = self.queue_capacity;
                            tokio::spawn(async move {
                                handle_connection(stream, addr, upgrade_path, queue_capacity, hub)
                                    .await;
                            });
                        }
                        Err(e) => {
                            return Err(RelayError::Listen(format!("accept: {}", e)));
                        }
                    }
                }
                _ = shutdown_rx.recv() => {
                    info!("🛑 Accept loop stopping, no new connections");
                    break;
                }
            }
        }
        Ok(())
    }
}

/// Upgrades one accepted TCP stream and hands it to the hub.
///
/// Requests for any path other than the configured upgrade path are rejected
/// with 404 during the handshake, before any connection state exists.
async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    upgrade_path: String,
    queue_capacity: usize,
    hub: HubHandle,
) {
    let path_check = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        if request.uri().path() == upgrade_path {
            Ok(response)
        } else {
            let mut rejection = ErrorResponse::new(Some("not found".to_string()));
            *rejection.status_mut() = StatusCode::NOT_FOUND;
            Err(rejection)
        }
    };

    let ws_stream = match accept_hdr_async(stream, path_check).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!("WebSocket handshake failed for {}: {}", addr, e);
            return;
        }
    };

    let id = ConnectionId::new();
    connection::spawn_pumps(id, addr, ws_stream, &hub, queue_capacity);
}
