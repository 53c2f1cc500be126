//! Logging system setup and configuration
//!
//! This module handles the initialization of the tracing-based logging system
//! used throughout the server for debugging, monitoring, and diagnostic output.

use anyhow::Result;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize the logging system
///
/// Sets up structured logging using the tracing crate with configurable
/// output format and filtering levels.
///
/// # Arguments
/// * `level` - Base logging level ("trace", "debug", "info", "warn", "error")
/// * `json_format` - Whether to emit structured JSON logs instead of
///   human-readable output
///
/// # Environment Variables
/// * `RUST_LOG` - Overrides the configured filter (e.g., "debug",
///   "relay_server=trace")
pub fn setup_logging(level: &str, json_format: bool) -> Result<()> {
    // Respect RUST_LOG when set, falling back to the configured level
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    if json_format {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_target(false))
            .try_init()?;
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(false))
            .try_init()?;
    }

    Ok(())
}
