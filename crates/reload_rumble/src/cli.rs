//! Command-line argument parsing
//!
//! This module defines the command-line interface for the Reload Rumble
//! relay server using the clap crate for argument parsing.

use clap::Parser;
use std::path::PathBuf;

/// Command-line arguments for the Reload Rumble relay server
///
/// These arguments allow users to override configuration file settings
/// and control server behavior from the command line.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Configuration file path
    ///
    /// Specifies the path to the TOML configuration file. The file must
    /// exist and parse; the server refuses to start without it.
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    /// Listen port
    ///
    /// Override the TCP listen port from the configuration file.
    #[arg(short, long)]
    pub port: Option<u16>,

    /// Enable debug logging
    ///
    /// When enabled, sets the logging level to debug, providing more
    /// detailed output for troubleshooting.
    #[arg(short, long)]
    pub debug: bool,

    /// Output logs in JSON format
    #[arg(long)]
    pub json_logs: bool,
}

impl Default for Args {
    fn default() -> Self {
        Self {
            config: PathBuf::from("config.toml"),
            port: None,
            debug: false,
            json_logs: false,
        }
    }
}
