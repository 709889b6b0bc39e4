//! Command-line arguments

use anyhow::Context;
use clap::{ArgAction, Args, Parser, Subcommand};
use cs2000_core::config::SessionConfig;
use cs2000_core::instrument::FailurePolicy;
use std::path::PathBuf;

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), " (", env!("CS2000_BUILD_ID"), ")");

/// Remote control for CS2000-class luminance meters
#[derive(Parser, Debug)]
#[command(name = "cs2000", version = VERSION, about)]
pub struct Cli {
    #[command(flatten)]
    pub session: SessionArgs,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Subcommand, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliCommand {
    /// List serial ports with description and manufacturer
    Ports,
    /// Put the meter in remote mode and configure sync
    Init,
    /// Measure and print luminance
    Lv,
    /// Measure and print chromaticity x, y and luminance
    Xylv,
}

#[derive(Args, Debug, Default)]
pub struct SessionArgs {
    /// Serial port (e.g. /dev/ttyUSB0 or COM1)
    #[arg(short, long, global = true)]
    pub port: Option<String>,

    /// Baud rate [default: 115200]
    #[arg(short, long, global = true)]
    pub baud: Option<u32>,

    /// Reply timeout in seconds, 0 waits indefinitely [default: 0]
    #[arg(short, long, global = true)]
    pub timeout: Option<f64>,

    /// Internal sync frequency in Hz [default: 60]
    #[arg(long = "sync-freq", global = true)]
    pub sync_freq: Option<u32>,

    /// Stop at the first failed step instead of carrying on
    #[arg(long, global = true)]
    pub abort_on_error: bool,

    /// JSON configuration file; flags override its values
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Talk to a simulated meter instead of a serial port
    #[arg(long, global = true)]
    pub demo: bool,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    /// More log output (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,
}

impl SessionArgs {
    /// Merge the config file (if any) with command-line overrides
    pub fn session_config(&self) -> anyhow::Result<SessionConfig> {
        let mut config = match &self.config {
            Some(path) => SessionConfig::load(path)
                .with_context(|| format!("failed to load config {}", path.display()))?,
            None => SessionConfig::default(),
        };

        if let Some(port) = &self.port {
            config.connection.port = Some(port.clone());
        }
        if let Some(baud) = self.baud {
            config.connection.baud_rate = baud;
        }
        if let Some(timeout) = self.timeout {
            config.connection.timeout_secs = timeout;
        }
        if let Some(freq) = self.sync_freq {
            config.init.sync_frequency_hz = freq;
        }
        if self.abort_on_error {
            config.init.failure_policy = FailurePolicy::Abort;
        }

        config.validate()?;
        Ok(config)
    }

    /// Default log filter for the requested verbosity
    pub fn log_level(&self) -> &'static str {
        match self.verbose {
            0 => "info",
            1 => "debug",
            _ => "trace",
        }
    }
}
