//! Configuration settings for the relay server.
//!
//! Settings are loaded from a TOML file. The only option a deployment must
//! provide is the listen port; everything else has a sensible default. A
//! missing or unparsable file is a fatal startup error - the process exits
//! rather than guessing at a configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::RelayError;

/// Root configuration object, serialized to/from TOML.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct Config {
    /// Server-specific settings
    pub server: ServerSettings,
    /// Optional logging configuration
    pub logging: Option<LoggingSettings>,
}

/// Server configuration settings.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct ServerSettings {
    /// TCP listen port. The one option every deployment must set.
    pub port: u16,

    /// Interface to bind. Defaults to all interfaces.
    #[serde(default = "default_bind_host")]
    pub bind_host: String,

    /// Capacity of each connection's outbound message queue.
    ///
    /// When a recipient's queue is full it is treated as a slow consumer
    /// and evicted rather than waited on.
    #[serde(default = "default_queue_capacity")]
    pub outbound_queue_capacity: usize,

    /// HTTP path accepting the WebSocket upgrade.
    #[serde(default = "default_upgrade_path")]
    pub upgrade_path: String,
}

/// Logging system configuration.
#[derive(Deserialize, Serialize, Debug, Clone)]
pub struct LoggingSettings {
    /// Logging level filter: "trace", "debug", "info", "warn", "error"
    pub level: String,
    /// Enable JSON-formatted log output
    pub json_format: bool,
}

fn default_bind_host() -> String {
    "0.0.0.0".to_string()
}

fn default_queue_capacity() -> usize {
    256
}

fn default_upgrade_path() -> String {
    "/ws".to_string()
}

impl Config {
    /// The full listen address in "host:port" form.
    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.bind_host, self.server.port)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            server: ServerSettings {
                port: 8080,
                bind_host: default_bind_host(),
                outbound_queue_capacity: default_queue_capacity(),
                upgrade_path: default_upgrade_path(),
            },
            logging: Some(LoggingSettings {
                level: "info".to_string(),
                json_format: false,
            }),
        }
    }
}

/// Load configuration from a file.
///
/// Unlike a development-friendly create-default-on-missing scheme, a relay
/// deployment with no readable configuration is refused outright: both a
/// missing file and a parse failure yield [`RelayError::Config`], which the
/// binary maps to exit status 1 before any socket is opened.
pub async fn load_config(path: &Path) -> Result<Config, RelayError> {
    let raw = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))?;
    toml::from_str(&raw)
        .map_err(|e| RelayError::Config(format!("{}: {}", path.display(), e)))
}
