//! Subcommand definitions.

use std::path::PathBuf;

use clap::{Args, Subcommand};

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Read JSON-lines messages from stdin and print responses to stdout
    Run(RunArgs),

    /// Inspect the effective configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommand,
    },
}

#[derive(Debug, Clone, Args)]
pub struct RunArgs {
    /// Preference file (created on first save)
    #[arg(
        long = "storage",
        env = "READOUT_STORAGE",
        default_value = "readout-preferences.json"
    )]
    pub storage: PathBuf,

    /// Also print runtime events
    #[arg(long = "events")]
    pub events: bool,

    /// Tab whose counterpart never answers until reinstalled (repeatable)
    #[arg(long = "offline-tab", value_name = "TAB_ID")]
    pub offline_tabs: Vec<i64>,

    /// Tab that can never host a counterpart (repeatable)
    #[arg(long = "restricted-tab", value_name = "TAB_ID")]
    pub restricted_tabs: Vec<i64>,
}

#[derive(Debug, Clone, Copy, Subcommand)]
pub enum ConfigCommand {
    /// Print the effective configuration as JSON
    Show,
    /// Validate the configuration and exit
    Check,
}
