use anyhow::Result;
use autopilot_cli::{init_logging, EngineConfig};
use clap::Parser;
use tracing::{error, info};

use super::commands::Commands;
use super::env::CliArgs;
use super::info::cmd_commands;
use super::run::cmd_run;

pub async fn run() -> Result<()> {
    let cli = CliArgs::parse();

    let mut config = EngineConfig::load(cli.config.as_deref())?;
    if let Some(level) = &cli.log_level {
        config.logging.level = level.clone();
    }
    let _log_guard = init_logging(&config.logging, cli.debug)?;

    info!("Starting autopilot v{}", env!("CARGO_PKG_VERSION"));

    let result = match cli.command {
        Commands::Commands(args) => cmd_commands(args, cli.output),
        Commands::Run(args) => cmd_run(args, &config, cli.output).await,
    };
    match result {
        Ok(()) => {
            info!("Command completed successfully");
            Ok(())
        }
        Err(err) => {
            error!("Command failed: {}", err);
            Err(err)
        }
    }
}
