//! Conveyor CLI -- streams a remote log stream to stdout.

mod cli;
mod commands;
mod error;
mod logging;
mod output;

use std::path::{Path, PathBuf};

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error};

use conveyor_core::config::{ConveyorConfig, GeneralConfig};
use conveyor_core::error::ConveyorError;

use crate::cli::{Cli, Commands, DEFAULT_CONFIG_PATH};
use crate::error::CliError;
use crate::output::OutputWriter;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let (source, loaded) = load_config(cli.config.as_deref()).await;

    let mut general = loaded
        .as_ref()
        .map(|config| config.general.clone())
        .unwrap_or_else(|_| GeneralConfig::default());
    if let Some(level) = &cli.log_level {
        general.log_level.clone_from(level);
    }
    logging::init_tracing(&general)?;
    conveyor_core::metrics::describe_all();
    debug!(source = %source, "configuration resolved");

    let writer = OutputWriter::new(cli.output);
    let result = match cli.command {
        Commands::Tail(args) => match loaded {
            Ok(config) => commands::tail::execute(args, config, &writer).await,
            Err(e) => Err(CliError::from(e)),
        },
        Commands::Config(args) => commands::config::execute(args, &source, loaded, &writer),
    };

    if let Err(e) = result {
        error!(error = %e, "command failed");
        eprintln!("error: {e}");
        std::process::exit(e.exit_code());
    }

    Ok(())
}

/// Resolve and load the configuration.
///
/// An explicit path must exist. Without one, `./conveyor.toml` is used when
/// present; otherwise defaults plus environment overrides apply.
/// Returns a label describing the source along with the load result.
async fn load_config(path: Option<&Path>) -> (String, Result<ConveyorConfig, ConveyorError>) {
    let path = match path {
        Some(path) => path.to_path_buf(),
        None => {
            let default = PathBuf::from(DEFAULT_CONFIG_PATH);
            if !default.exists() {
                let mut config = ConveyorConfig::default();
                config.apply_env_overrides();
                let result = config.validate().map(|()| config);
                return ("defaults".to_owned(), result);
            }
            default
        }
    };

    let result = ConveyorConfig::load(&path).await;
    (path.display().to_string(), result)
}
