//! Signal handling for graceful server shutdown.
//!
//! Listens for the termination signals the relay responds to and returns
//! when one arrives, so the caller can trigger the shutdown sequence.

use tokio::signal;
use tracing::info;

/// Waits for a termination signal.
///
/// # Platform Support
///
/// * **Unix platforms**: Handles SIGINT (Ctrl+C), SIGQUIT, and SIGTERM
/// * **Windows**: Handles Ctrl+C
///
/// # Returns
///
/// `Ok(())` once a signal is received, or an error if signal handler
/// installation failed.
pub async fn wait_for_signal() -> Result<(), Box<dyn std::error::Error>> {
    #[cfg(unix)]
    {
        use signal::unix::{signal, SignalKind};

        let mut sigint = signal(SignalKind::interrupt())?;
        let mut sigquit = signal(SignalKind::quit())?;
        let mut sigterm = signal(SignalKind::terminate())?;

        tokio::select! {
            _ = sigint.recv() => {
                info!("📡 Received SIGINT");
            }
            _ = sigquit.recv() => {
                info!("📡 Received SIGQUIT");
            }
            _ = sigterm.recv() => {
                info!("📡 Received SIGTERM");
            }
        }
    }

    #[cfg(windows)]
    {
        signal::ctrl_c().await?;
        info!("📡 Received Ctrl+C");
    }

    Ok(())
}
