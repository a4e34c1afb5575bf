//! Terminal host for the readout runtime.
//!
//! The `readout` binary stands in for a browser: it wires an
//! [`AppContext`](readout_runtime::AppContext) to a simulated counterpart,
//! file-backed preferences and a line-oriented menu, then feeds it
//! JSON-lines messages from stdin.

#![deny(unused_crate_dependencies)]

// Silence unused dev-dependency warnings
#[cfg(test)]
use tempfile as _;
#[cfg(test)]
use tokio_test as _;

// Used by the binary only
use dotenvy as _;

pub mod bootstrap;
pub mod commands;
pub mod error;
pub mod handlers;
pub mod host;
pub mod output;
pub mod parser;

pub use bootstrap::{CliContext, bootstrap, init_tracing, load_config};
pub use commands::{Commands, ConfigCommand, RunArgs};
pub use error::CliError;
pub use parser::{Cli, ConfigOverrides};
