//! dlvsix CLI

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use dlvsix_cli::ops::{self, AppError};
use dlvsix_cli::{Cli, Commands};

/// Exit status after Ctrl-C.
const EXIT_INTERRUPTED: u8 = 130;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(cli.log_level().as_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();

    tokio::select! {
        result = run(&cli) => match result {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                tracing::error!("{e:#}");
                ExitCode::FAILURE
            }
        },
        _ = tokio::signal::ctrl_c() => {
            tracing::error!("Aborted by user");
            ExitCode::from(EXIT_INTERRUPTED)
        }
    }
}

async fn run(cli: &Cli) -> anyhow::Result<()> {
    let result: Result<(), AppError> = match &cli.command {
        Commands::Download(args) => ops::download::download(args).await,
        Commands::Install(args) => ops::install::install(args).await,
    };
    Ok(result?)
}
