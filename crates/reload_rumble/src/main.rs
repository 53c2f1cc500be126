//! Main application entry point for the Reload Rumble relay server
//!
//! Provides CLI interface, configuration loading, signal handling, and
//! server startup around the relay core.

mod cli;
mod signals;

use clap::Parser;
use tokio::time::{sleep, timeout, Duration};
use tracing::{error, info};

use cli::Args;
use relay_server::{config, logging, Hub, LoggingSettings, RelayServer, ShutdownController};

/// Interval between connection-count statistics log lines.
const STATS_INTERVAL: Duration = Duration::from_secs(60);

/// How long to wait for the accept loop and write pumps to wind down after
/// a shutdown signal.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(5);

/// Resolves the effective logging level and format from CLI flags and the
/// optional `[logging]` config section. CLI flags win.
fn logging_prefs(args: &Args, settings: Option<&LoggingSettings>) -> (String, bool) {
    let level = if args.debug {
        "debug".to_string()
    } else {
        settings
            .map(|s| s.level.clone())
            .unwrap_or_else(|| "info".to_string())
    };
    let json = args.json_logs || settings.map(|s| s.json_format).unwrap_or(false);
    (level, json)
}

#[tokio::main(flavor = "multi_thread")]
async fn main() {
    let args = Args::parse();

    // Configuration is loaded before logging is configured, so a load
    // failure initializes logging with defaults just to report it.
    let mut config = match config::load_config(&args.config).await {
        Ok(config) => config,
        Err(e) => {
            let (level, json) = logging_prefs(&args, None);
            let _ = logging::setup_logging(&level, json);
            error!("❌ {}", e);
            error!("Failed to load configuration from {}", args.config.display());
            std::process::exit(1);
        }
    };

    if let Some(port) = args.port {
        config.server.port = port;
    }

    let (level, json) = logging_prefs(&args, config.logging.as_ref());
    if let Err(e) = logging::setup_logging(&level, json) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    info!(
        "🚀 Reload Rumble relay server v{}",
        env!("CARGO_PKG_VERSION")
    );
    info!(
        "📂 Config: {} | Listening on {}",
        args.config.display(),
        config.listen_addr()
    );

    let shutdown = ShutdownController::new();
    let (hub, handle) = Hub::new(shutdown.subscribe());
    tokio::spawn(hub.run());

    let server = match RelayServer::bind(&config, handle.clone(), shutdown.clone()).await {
        Ok(server) => server,
        Err(e) => {
            error!("❌ {}", e);
            std::process::exit(1);
        }
    };

    // Periodic health line with the live connection count.
    let stats_task = {
        let hub = handle.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(STATS_INTERVAL);
            ticker.tick().await; // immediate first tick carries no news
            loop {
                ticker.tick().await;
                info!("📊 {} connection(s) active", hub.connection_count().await);
            }
        })
    };

    let mut server_task = tokio::spawn(server.serve());
    info!("🛑 Press Ctrl+C to shut down");

    tokio::select! {
        result = &mut server_task => {
            match result {
                Ok(Ok(())) => info!("Server stopped"),
                Ok(Err(e)) => {
                    error!("❌ {}", e);
                    std::process::exit(1);
                }
                Err(e) => {
                    error!("❌ Server task failed: {}", e);
                    std::process::exit(1);
                }
            }
        }
        signal = signals::wait_for_signal() => {
            if let Err(e) = signal {
                error!("Signal handler failed: {}", e);
            }
            info!("🛑 Shutting down Reload Rumble relay...");
            shutdown.trigger();

            // Accept loop stops on the signal; write pumps drain whatever
            // the hub released before sockets close.
            let _ = timeout(SHUTDOWN_GRACE, &mut server_task).await;
            sleep(Duration::from_millis(250)).await;
        }
    }

    stats_task.abort();
    info!("✅ Reload Rumble relay shutdown complete");
}
