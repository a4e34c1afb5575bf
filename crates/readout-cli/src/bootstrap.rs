//! CLI bootstrap, the composition root.
//!
//! Configuration is layered here (defaults, JSON file, `READOUT_*`
//! environment, flags) and the runtime is built with the simulated host
//! adapters from [`crate::host`]. Command handlers receive the composed
//! [`CliContext`].

use std::path::Path;
use std::sync::Arc;

use readout_core::{ReadoutConfig, TabId};
use readout_runtime::{AppContext, HostPorts, JsonFileStorage};
use tracing::{debug, info};
use tracing_subscriber::EnvFilter;

use crate::commands::RunArgs;
use crate::error::CliError;
use crate::host::{SimulatedCounterpart, SinkMenu, SinkNotifier};
use crate::output::LineSink;
use crate::parser::ConfigOverrides;

/// Fully composed context for the `run` command.
pub struct CliContext {
    pub app: AppContext,
    pub counterpart: Arc<SimulatedCounterpart>,
    pub sink: Arc<dyn LineSink>,
}

/// Resolve the effective configuration.
///
/// Later layers win: compiled defaults, then `path` (if any), then the
/// process environment, then `overrides`. The result is validated.
pub fn load_config(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
) -> Result<ReadoutConfig, CliError> {
    load_config_with(path, overrides, |key| std::env::var(key).ok())
}

/// [`load_config`] with an explicit environment lookup.
pub fn load_config_with(
    path: Option<&Path>,
    overrides: &ConfigOverrides,
    env: impl Fn(&str) -> Option<String>,
) -> Result<ReadoutConfig, CliError> {
    let mut config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .map_err(|e| CliError::Io(format!("Failed to read {}: {e}", path.display())))?;
            ReadoutConfig::from_json_str(&raw)?
        }
        None => ReadoutConfig::default(),
    };
    config.apply_env_with(env)?;
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Install the global subscriber. `RUST_LOG` wins over the configured level.
pub fn init_tracing(config: &ReadoutConfig, verbose: bool) {
    let default_level = if verbose {
        "debug"
    } else {
        config.log_level.as_filter_str()
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Build the runtime with simulated host adapters writing to `sink`.
pub async fn bootstrap(
    config: ReadoutConfig,
    args: &RunArgs,
    sink: Arc<dyn LineSink>,
) -> Result<CliContext, CliError> {
    let counterpart = Arc::new(SimulatedCounterpart::new(
        Arc::clone(&sink),
        args.offline_tabs.iter().copied().map(TabId),
        args.restricted_tabs.iter().copied().map(TabId),
    ));
    debug!(
        storage = %args.storage.display(),
        offline = args.offline_tabs.len(),
        restricted = args.restricted_tabs.len(),
        "Composing host adapters"
    );

    let app = AppContext::build(
        config,
        HostPorts {
            counterpart: counterpart.clone(),
            storage: Arc::new(JsonFileStorage::new(&args.storage)),
            menu: Arc::new(SinkMenu::new(Arc::clone(&sink))),
            notifier: Arc::new(SinkNotifier::new(Arc::clone(&sink))),
        },
    )
    .await?;
    info!(storage = %args.storage.display(), "Host ready");

    Ok(CliContext {
        app,
        counterpart,
        sink,
    })
}
