//! Root CLI structure and global options.

use std::path::PathBuf;

use clap::{Args, Parser};
use readout_core::{LogLevel, ReadoutConfig};

use crate::commands::Commands;

/// Drive the readout speech-session runtime from a terminal.
#[derive(Debug, Parser)]
#[command(name = "readout")]
#[command(about = "Drive the readout speech-session runtime from a terminal")]
#[command(version)]
pub struct Cli {
    /// JSON configuration file
    #[arg(short = 'c', long = "config", env = "READOUT_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Enable verbose/debug output
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,

    #[command(flatten)]
    pub overrides: ConfigOverrides,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

/// Flags that win over the configuration file and the environment.
#[derive(Debug, Clone, Default, Args)]
pub struct ConfigOverrides {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long = "log-level", global = true)]
    pub log_level: Option<LogLevel>,

    /// Maximum queued messages before new ones are rejected
    #[arg(long = "queue-capacity", global = true)]
    pub queue_capacity: Option<usize>,

    /// Per-message handler timeout in milliseconds
    #[arg(long = "command-timeout-ms", global = true)]
    pub command_timeout_ms: Option<u64>,

    /// Automatic stop after this many milliseconds of speech
    #[arg(long = "max-session-ms", global = true)]
    pub max_session_duration_ms: Option<u64>,

    /// Longest accepted text, in characters
    #[arg(long = "max-text-chars", global = true)]
    pub max_text_chars: Option<usize>,

    /// Interval between recovery sweeps in milliseconds
    #[arg(long = "sweep-interval-ms", global = true)]
    pub sweep_interval_ms: Option<u64>,
}

impl ConfigOverrides {
    pub fn apply(&self, config: &mut ReadoutConfig) {
        if let Some(level) = self.log_level {
            config.log_level = level;
        }
        if let Some(capacity) = self.queue_capacity {
            config.queue_capacity = capacity;
        }
        if let Some(ms) = self.command_timeout_ms {
            config.command_timeout_ms = ms;
        }
        if let Some(ms) = self.max_session_duration_ms {
            config.max_session_duration_ms = ms;
        }
        if let Some(chars) = self.max_text_chars {
            config.max_text_chars = chars;
        }
        if let Some(ms) = self.sweep_interval_ms {
            config.sweep_interval_ms = ms;
        }
    }
}
