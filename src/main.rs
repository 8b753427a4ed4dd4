mod cli;
mod config;
mod error;
mod executor;
mod filter;
mod models;
mod output;
mod registry;
mod selector;
#[cfg(test)]
mod testing;

use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing::{debug, error, warn};

use cli::Cli;
use config::{Mode, PruneConfig, RegistryConfig};
use filter::Matchers;
use output::{init_logging, report_summary};
use registry::{Registry, RegistryClient};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = init_logging(cli.log_level.into()) {
        eprintln!("Error: {:#}", e);
        return ExitCode::FAILURE;
    }

    match run(&cli).await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: &Cli) -> Result<ExitCode> {
    let config = PruneConfig::from_cli(cli)?;
    if config.delete_untagged && !config.filter.sweeps_untagged() {
        warn!(
            filter = %config.filter,
            "--delete-untagged only applies when the tag filter is `.*`; ignoring"
        );
    }

    // Compile before touching the registry so a bad pattern fails fast.
    let matchers = config.filter.matchers(config.mode)?;
    let client = RegistryClient::connect(&RegistryConfig::from_cli(cli)).await?;

    Ok(dispatch(&client, &config, &matchers).await)
}

/// Run the configured mode against `registry` and pick the exit status.
///
/// Check mode exits 0 only when the exact tag exists. Other modes exit 1
/// on any fatal error.
async fn dispatch<R: Registry>(
    registry: &R,
    config: &PruneConfig,
    matchers: &Matchers,
) -> ExitCode {
    if config.mode == Mode::Check {
        return match executor::check_exists(registry, &config.filter).await {
            Ok(true) => {
                debug!("check: image {} found", config.filter);
                ExitCode::SUCCESS
            }
            Ok(false) => {
                debug!("check: image {} not found", config.filter);
                ExitCode::FAILURE
            }
            Err(e) => {
                error!("check: {}", e);
                ExitCode::FAILURE
            }
        };
    }

    match executor::run(registry, config, matchers).await {
        Ok(summary) => {
            report_summary(&summary, config.deletes());
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("pruning with filter {}: {}", config.filter, e);
            ExitCode::FAILURE
        }
    }
}
