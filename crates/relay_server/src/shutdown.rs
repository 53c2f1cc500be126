//! Shutdown coordination.
//!
//! A single broadcast channel threaded into the accept loop and the hub loop.
//! Triggering it stops the accept loop (no new registrations), then lets the
//! hub release every outbound queue so write pumps can drain in-flight
//! messages before their sockets close.

use tokio::sync::broadcast;

/// Cloneable handle to the process-wide shutdown signal.
#[derive(Clone)]
pub struct ShutdownController {
    sender: broadcast::Sender<()>,
}

impl ShutdownController {
    /// Creates a new shutdown controller with no signal pending.
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(1);
        Self { sender }
    }

    /// Subscribes a component to the shutdown signal.
    pub fn subscribe(&self) -> broadcast::Receiver<()> {
        self.sender.subscribe()
    }

    /// Signals every subscribed component to shut down.
    ///
    /// Safe to call more than once; components only react to the first
    /// delivery they observe.
    pub fn trigger(&self) {
        // send() errs when nothing is subscribed, which only happens after
        // every loop has already stopped.
        let _ = self.sender.send(());
    }
}

impl Default for ShutdownController {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{timeout, Duration};

    #[tokio::test]
    async fn test_trigger_reaches_all_subscribers() {
        let controller = ShutdownController::new();
        let mut first = controller.subscribe();
        let mut second = controller.subscribe();

        controller.trigger();

        timeout(Duration::from_millis(100), first.recv())
            .await
            .expect("first subscriber should see the signal")
            .expect("channel should deliver");
        timeout(Duration::from_millis(100), second.recv())
            .await
            .expect("second subscriber should see the signal")
            .expect("channel should deliver");
    }

    #[tokio::test]
    async fn test_untriggered_signal_is_pending() {
        let controller = ShutdownController::new();
        let mut rx = controller.subscribe();

        let result = timeout(Duration::from_millis(20), rx.recv()).await;
        assert!(result.is_err(), "no signal should arrive before trigger");
    }
}
