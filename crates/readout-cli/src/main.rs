//! CLI entry point.
//!
//! Loads `.env`, parses flags, resolves the configuration and dispatches to
//! the command handlers. Errors map to sysexits-style exit codes.

use std::process::ExitCode;
use std::sync::Arc;

use clap::{CommandFactory, Parser};
use readout_cli::output::StdoutSink;
use readout_cli::{Cli, CliError, Commands, bootstrap, handlers, init_tracing, load_config};

#[tokio::main]
async fn main() -> ExitCode {
    // Load environment variables before clap reads `env` defaults
    dotenvy::dotenv().ok();

    let cli = Cli::parse();
    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err:#}");
            let code = err.downcast_ref::<CliError>().map_or(1, CliError::exit_code);
            ExitCode::from(code)
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let Some(command) = cli.command else {
        Cli::command().print_help()?;
        return Ok(());
    };

    let config = load_config(cli.config.as_deref(), &cli.overrides)?;
    init_tracing(&config, cli.verbose);

    match command {
        Commands::Run(args) => {
            let ctx = bootstrap(config, &args, Arc::new(StdoutSink)).await?;
            handlers::run::execute(&ctx, &args).await?;
        }
        Commands::Config { command } => handlers::config::execute(&config, command)?,
    }
    Ok(())
}
