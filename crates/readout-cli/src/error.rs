//! CLI error types and exit codes.

use readout_core::ConfigError;
use readout_runtime::ContextError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration could not be loaded or failed validation.
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// File or stream I/O failed.
    #[error("IO error: {0}")]
    Io(String),

    /// The runtime failed to start or to shut down cleanly.
    #[error("Runtime error: {0}")]
    Runtime(#[from] ContextError),
}

impl CliError {
    /// Map to a process exit code (sysexits.h where one fits).
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Config(_) | Self::Runtime(ContextError::Config(_)) => 78, // EX_CONFIG
            Self::Io(_) => 74,                                               // EX_IOERR
            Self::Runtime(_) => 1,
        }
    }
}
