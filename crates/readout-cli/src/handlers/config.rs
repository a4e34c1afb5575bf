//! `readout config` handler.

use anyhow::{Context, Result};
use readout_core::ReadoutConfig;

use crate::commands::ConfigCommand;

/// `config` was already loaded and validated by the caller.
pub fn execute(config: &ReadoutConfig, command: ConfigCommand) -> Result<()> {
    match command {
        ConfigCommand::Show => {
            let json =
                serde_json::to_string_pretty(config).context("failed to encode configuration")?;
            println!("{json}");
        }
        ConfigCommand::Check => println!("✓ Configuration is valid."),
    }
    Ok(())
}
