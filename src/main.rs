use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

use simcue_load::cli::{Cli, Mode};
use simcue_load::commands;

/// Exit status when the run completed but a threshold was crossed
const THRESHOLDS_FAILED: u8 = 99;

fn init_tracing(verbose: bool) -> Result<()> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "info" }));
    let subscriber = tracing_subscriber::fmt().with_env_filter(filter).finish();
    tracing::subscriber::set_global_default(subscriber)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    // Parse command line arguments
    let cli = Cli::parse();

    match cli.mode {
        Mode::Run(args) => {
            init_tracing(args.verbose)?;

            let result = commands::run::run(args).await?;
            if !result.thresholds_passed() {
                return Ok(ExitCode::from(THRESHOLDS_FAILED));
            }
        }

        Mode::Plan(args) => {
            init_tracing(args.verbose)?;
            commands::plan::run(args)?;
        }
    }

    Ok(ExitCode::SUCCESS)
}
