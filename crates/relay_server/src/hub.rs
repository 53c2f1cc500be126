//! Hub registry and broadcaster.
//!
//! The hub is the single authority over "who is connected" and "who receives
//! what". Registration, unregistration, and broadcast all arrive as requests
//! on unbounded channels and are applied one at a time inside [`Hub::run`],
//! so the connection registry is never touched concurrently and needs no
//! locking.
//!
//! Fan-out never blocks: each recipient gets one non-blocking enqueue onto
//! its bounded outbound queue, and a full queue evicts that recipient. A
//! single slow client can therefore never stall delivery to the rest of the
//! room.

use std::collections::HashMap;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::sync::{broadcast, oneshot};
use tracing::{debug, info, warn};

use crate::error::RelayError;
use crate::message::{BroadcastRequest, ConnectionId, Payload};

/// A registration request: a connection identity paired with the sending end
/// of its outbound queue.
struct Registration {
    id: ConnectionId,
    outbound: mpsc::Sender<Payload>,
}

/// The central coordinator owning the live-connection registry.
///
/// Constructed together with its [`HubHandle`] via [`Hub::new`]; consumed by
/// [`Hub::run`], which is typically spawned as a long-lived task.
pub struct Hub {
    /// Live connections. Only ever read or written inside the `run` loop.
    connections: HashMap<ConnectionId, mpsc::Sender<Payload>>,
    register_rx: mpsc::UnboundedReceiver<Registration>,
    unregister_rx: mpsc::UnboundedReceiver<ConnectionId>,
    broadcast_rx: mpsc::UnboundedReceiver<BroadcastRequest>,
    count_rx: mpsc::UnboundedReceiver<oneshot::Sender<usize>>,
    shutdown_rx: broadcast::Receiver<()>,
}

/// Cheap-to-clone sender bundle for submitting requests to the hub.
///
/// Handed to the accept loop and to every connection's pumps. All operations
/// are fire-and-forget requests; none of them mutate the registry directly.
#[derive(Clone)]
pub struct HubHandle {
    register_tx: mpsc::UnboundedSender<Registration>,
    unregister_tx: mpsc::UnboundedSender<ConnectionId>,
    broadcast_tx: mpsc::UnboundedSender<BroadcastRequest>,
    count_tx: mpsc::UnboundedSender<oneshot::Sender<usize>>,
}

impl Hub {
    /// Creates a hub and its request handle.
    ///
    /// # Arguments
    ///
    /// * `shutdown_rx` - Receiver on the process-wide shutdown channel; when
    ///   it fires, the run loop stops and releases every outbound queue.
    pub fn new(shutdown_rx: broadcast::Receiver<()>) -> (Self, HubHandle) {
        let (register_tx, register_rx) = mpsc::unbounded_channel();
        let (unregister_tx, unregister_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, broadcast_rx) = mpsc::unbounded_channel();
        let (count_tx, count_rx) = mpsc::unbounded_channel();

        let hub = Self {
            connections: HashMap::new(),
            register_rx,
            unregister_rx,
            broadcast_rx,
            count_rx,
            shutdown_rx,
        };
        let handle = HubHandle {
            register_tx,
            unregister_tx,
            broadcast_tx,
            count_tx,
        };
        (hub, handle)
    }

    /// Runs the serialized request-processing loop until shutdown.
    ///
    /// Requests from the three channels are merged and applied one at a time.
    /// On shutdown the registry is dropped wholesale, closing every outbound
    /// queue; write pumps then drain whatever is already enqueued and close
    /// their sockets.
    pub async fn run(mut self) {
        info!("🔄 Hub loop started");
        loop {
            tokio::select! {
                Some(registration) = self.register_rx.recv() => {
                    self.register(registration);
                }
                Some(id) = self.unregister_rx.recv() => {
                    self.unregister(id);
                }
                Some(request) = self.broadcast_rx.recv() => {
                    self.broadcast(request);
                }
                Some(reply) = self.count_rx.recv() => {
                    let _ = reply.send(self.connections.len());
                }
                _ = self.shutdown_rx.recv() => {
                    break;
                }
                else => break,
            }
        }

        info!(
            "🛑 Hub stopping, releasing {} connection(s) for drain",
            self.connections.len()
        );
        // Dropping the senders closes every outbound queue; write pumps see
        // the close after draining buffered messages.
        self.connections.clear();
    }

    /// Adds a connection to the live set.
    ///
    /// Duplicate registration of the same identity is last-write-wins: the
    /// displaced queue closes, so the orphaned write pump drains and exits.
    fn register(&mut self, registration: Registration) {
        let Registration { id, outbound } = registration;
        if self.connections.insert(id, outbound).is_some() {
            warn!("Connection {} re-registered, replacing previous queue", id);
        } else {
            info!(
                "✅ Connection {} registered ({} active)",
                id,
                self.connections.len()
            );
        }
    }

    /// Removes a connection from the live set if present.
    ///
    /// A no-op when already absent, which is exactly what the race between a
    /// read pump and a write pump both reporting the same death needs.
    fn unregister(&mut self, id: ConnectionId) {
        if self.connections.remove(&id).is_some() {
            info!(
                "👋 Connection {} unregistered ({} remaining)",
                id,
                self.connections.len()
            );
        } else {
            debug!("Connection {} already unregistered", id);
        }
    }

    /// Fans a message out to every registered connection except its origin.
    ///
    /// Enqueue is attempted exactly once per recipient. A full queue means a
    /// slow consumer and a closed queue means a dying connection; both are
    /// evicted rather than waited on.
    fn broadcast(&mut self, request: BroadcastRequest) {
        let mut evicted: Vec<(ConnectionId, bool)> = Vec::new();

        for (id, queue) in &self.connections {
            if *id == request.origin {
                continue;
            }
            match queue.try_send(request.payload.clone()) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => evicted.push((*id, true)),
                Err(TrySendError::Closed(_)) => evicted.push((*id, false)),
            }
        }

        for (id, overloaded) in evicted {
            if overloaded {
                warn!("⚠️ {}", RelayError::Overload(id));
            } else {
                debug!("Connection {} queue closed during fan-out", id);
            }
            self.unregister(id);
        }
    }
}

impl HubHandle {
    /// Requests registration of a connection with its outbound queue sender.
    pub fn register(&self, id: ConnectionId, outbound: mpsc::Sender<Payload>) {
        let _ = self.register_tx.send(Registration { id, outbound });
    }

    /// Requests removal of a connection. Idempotent.
    pub fn unregister(&self, id: ConnectionId) {
        let _ = self.unregister_tx.send(id);
    }

    /// Submits a message for fan-out to everyone except its origin.
    pub fn broadcast(&self, request: BroadcastRequest) {
        let _ = self.broadcast_tx.send(request);
    }

    /// Queries the number of currently registered connections.
    ///
    /// Answered by the hub loop itself, so the reply reflects a point in the
    /// serialized request order. Returns 0 once the hub has stopped.
    pub async fn connection_count(&self) -> usize {
        let (tx, rx) = oneshot::channel();
        if self.count_tx.send(tx).is_err() {
            return 0;
        }
        rx.await.unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shutdown::ShutdownController;
    use tokio::time::{sleep, timeout, Duration};

    /// Spawns a hub and returns its handle plus the controller keeping the
    /// shutdown channel alive.
    fn spawn_hub() -> (HubHandle, ShutdownController) {
        let shutdown = ShutdownController::new();
        let (hub, handle) = Hub::new(shutdown.subscribe());
        tokio::spawn(hub.run());
        (handle, shutdown)
    }

    /// Polls the hub until the registered count matches, or panics.
    async fn wait_for_count(handle: &HubHandle, expected: usize) {
        timeout(Duration::from_secs(2), async {
            loop {
                if handle.connection_count().await == expected {
                    break;
                }
                sleep(Duration::from_millis(10)).await;
            }
        })
        .await
        .unwrap_or_else(|_| {
            panic!("hub never settled at {} connection(s)", expected)
        });
    }

    fn member(capacity: usize) -> (ConnectionId, mpsc::Receiver<Payload>, mpsc::Sender<Payload>) {
        let (tx, rx) = mpsc::channel(capacity);
        (ConnectionId::new(), rx, tx)
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_register_unregister_settles() {
        let (handle, _shutdown) = spawn_hub();

        let (a, _a_rx, a_tx) = member(8);
        let (b, _b_rx, b_tx) = member(8);
        let (c, _c_rx, c_tx) = member(8);

        handle.register(a, a_tx);
        handle.register(b, b_tx);
        handle.register(c, c_tx);
        wait_for_count(&handle, 3).await;

        handle.unregister(b);
        wait_for_count(&handle, 2).await;

        // Unregister is idempotent, even when both pumps report the death.
        handle.unregister(b);
        handle.unregister(b);
        wait_for_count(&handle, 2).await;
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_broadcast_excludes_origin() {
        let (handle, _shutdown) = spawn_hub();

        let (a, mut a_rx, a_tx) = member(8);
        let (b, mut b_rx, b_tx) = member(8);
        let (c, mut c_rx, c_tx) = member(8);
        handle.register(a, a_tx);
        handle.register(b, b_tx);
        handle.register(c, c_tx);
        wait_for_count(&handle, 3).await;

        handle.broadcast(BroadcastRequest {
            origin: a,
            payload: "hello".into(),
        });

        let to_b = timeout(Duration::from_secs(1), b_rx.recv())
            .await
            .expect("B should receive within a second")
            .expect("B's queue should be open");
        let to_c = timeout(Duration::from_secs(1), c_rx.recv())
            .await
            .expect("C should receive within a second")
            .expect("C's queue should be open");
        assert_eq!(to_b.as_bytes(), b"hello");
        assert_eq!(to_c.as_bytes(), b"hello");

        // The sender never hears its own message back.
        sleep(Duration::from_millis(50)).await;
        assert!(a_rx.try_recv().is_err(), "origin must not receive its own message");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_per_recipient_order_matches_submission_order() {
        let (handle, _shutdown) = spawn_hub();

        let (a, _a_rx, a_tx) = member(16);
        let (b, mut b_rx, b_tx) = member(16);
        handle.register(a, a_tx);
        handle.register(b, b_tx);
        wait_for_count(&handle, 2).await;

        for i in 0..10u8 {
            handle.broadcast(BroadcastRequest {
                origin: a,
                payload: vec![i].into(),
            });
        }

        for i in 0..10u8 {
            let payload = timeout(Duration::from_secs(1), b_rx.recv())
                .await
                .expect("delivery should not stall")
                .expect("queue should stay open");
            assert_eq!(payload.as_bytes(), &[i], "recipient order must be FIFO");
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_broadcast_after_unregister_skips_departed() {
        let (handle, _shutdown) = spawn_hub();

        let (a, mut a_rx, a_tx) = member(8);
        let (b, mut b_rx, b_tx) = member(8);
        handle.register(a, a_tx);
        handle.register(b, b_tx);
        wait_for_count(&handle, 2).await;

        handle.unregister(a);
        wait_for_count(&handle, 1).await;

        handle.broadcast(BroadcastRequest {
            origin: b,
            payload: "after you left".into(),
        });

        // A's queue was dropped by the hub, so its receiver just closes
        // without ever seeing the message.
        let gone = timeout(Duration::from_secs(1), a_rx.recv())
            .await
            .expect("A's queue should close promptly");
        assert!(gone.is_none(), "no delivery may be attempted to a departed connection");

        // B stays registered and the hub did not error out.
        wait_for_count(&handle, 1).await;
        assert!(b_rx.try_recv().is_err(), "origin receives nothing");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_slow_consumer_is_evicted() {
        let (handle, _shutdown) = spawn_hub();
        let capacity = 4;

        let (a, _a_rx, a_tx) = member(capacity);
        let (b, mut b_rx, b_tx) = member(capacity);
        handle.register(a, a_tx);
        handle.register(b, b_tx);
        wait_for_count(&handle, 2).await;

        // B's consumer is stalled: N broadcasts fill its queue, the (N+1)th
        // enqueue attempt fails and evicts it.
        for i in 0..=capacity as u8 {
            handle.broadcast(BroadcastRequest {
                origin: a,
                payload: vec![i].into(),
            });
        }
        wait_for_count(&handle, 1).await;

        // A later broadcast no longer targets B.
        handle.broadcast(BroadcastRequest {
            origin: a,
            payload: "too late".into(),
        });

        // B drains exactly the messages that fit before eviction, then sees
        // its queue close.
        for i in 0..capacity as u8 {
            let payload = b_rx.recv().await.expect("buffered message should survive");
            assert_eq!(payload.as_bytes(), &[i]);
        }
        let closed = timeout(Duration::from_secs(1), b_rx.recv())
            .await
            .expect("queue should close after eviction");
        assert!(closed.is_none(), "evicted connection's queue must be closed");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_duplicate_registration_last_write_wins() {
        let (handle, _shutdown) = spawn_hub();

        let id = ConnectionId::new();
        let (first_tx, mut first_rx) = mpsc::channel(8);
        let (second_tx, mut second_rx) = mpsc::channel(8);
        handle.register(id, first_tx);
        handle.register(id, second_tx);
        wait_for_count(&handle, 1).await;

        // The displaced queue closes so its write pump can exit.
        let displaced = timeout(Duration::from_secs(1), first_rx.recv())
            .await
            .expect("displaced queue should close");
        assert!(displaced.is_none());

        handle.broadcast(BroadcastRequest {
            origin: ConnectionId::new(),
            payload: "still here".into(),
        });
        let payload = timeout(Duration::from_secs(1), second_rx.recv())
            .await
            .expect("winning registration should receive")
            .expect("queue should be open");
        assert_eq!(payload.as_bytes(), b"still here");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_shutdown_drains_queued_messages() {
        let shutdown = ShutdownController::new();
        let (hub, handle) = Hub::new(shutdown.subscribe());
        let hub_task = tokio::spawn(hub.run());

        let (a, mut a_rx, a_tx) = member(8);
        handle.register(a, a_tx);
        wait_for_count(&handle, 1).await;

        handle.broadcast(BroadcastRequest {
            origin: ConnectionId::new(),
            payload: "in flight".into(),
        });
        // Wait until the fan-out has actually been applied before stopping.
        timeout(Duration::from_secs(1), async {
            loop {
                if !a_rx.is_empty() {
                    break;
                }
                sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .expect("broadcast should reach the queue before shutdown");

        shutdown.trigger();
        timeout(Duration::from_secs(1), hub_task)
            .await
            .expect("hub should stop on shutdown")
            .expect("hub task should not panic");

        // The buffered message survives the shutdown, then the queue closes.
        let payload = a_rx.recv().await.expect("queued message must drain");
        assert_eq!(payload.as_bytes(), b"in flight");
        assert!(a_rx.recv().await.is_none(), "queue closes after drain");

        assert_eq!(handle.connection_count().await, 0, "stopped hub reports zero");
    }
}
