//! Configuration and CLI argument handling

use std::{path::PathBuf, time::Duration};
use clap::Parser;

/// CLI argument parsing structure
#[derive(Parser, Debug)]
#[command(name = "ytraction")]
#[command(about = "Focus/rest timer service with a background watchdog and website blocklist")]
#[command(version)]
pub struct Config {
    /// Port to bind the server to
    #[arg(short, long, default_value = "20554")]
    pub port: u16,

    /// Host address to bind to
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// JSON file backing the persistent store
    #[arg(short, long, default_value = "ytraction-store.json")]
    pub data_file: PathBuf,

    /// Watchdog poll interval in seconds (1-5)
    #[arg(long, default_value = "1")]
    pub poll_interval: u64,

    /// Run the install hook: purge run state left by a previous session
    #[arg(long)]
    pub install: bool,

    /// Send desktop notifications through notify-send
    #[arg(long)]
    pub desktop_notifications: bool,

    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,
}

impl Config {
    pub const MIN_POLL_SECS: u64 = 1;
    pub const MAX_POLL_SECS: u64 = 5;

    /// Parse configuration from command line arguments
    pub fn parse() -> Self {
        Parser::parse()
    }

    /// Get the server address as a formatted string
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Get the appropriate log level based on verbose flag
    pub fn log_level(&self) -> &'static str {
        if self.verbose { "debug" } else { "info" }
    }

    /// Watchdog poll interval, clamped to the supported range
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(
            self.poll_interval
                .clamp(Self::MIN_POLL_SECS, Self::MAX_POLL_SECS),
        )
    }
}
