mod cli;
mod commands;
mod session;

use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use curator_engine::{ensure_data_dir, Settings};
use curator_logging::curator_error;

use crate::cli::{Cli, Command};

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    curator_logging::initialize(cli.log.into(), cli.log_level());

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            curator_error!("{err:#}");
            eprintln!("Error: {err:#}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<()> {
    let data_dir = cli.data_dir();
    ensure_data_dir(&data_dir)
        .with_context(|| format!("preparing data directory {}", data_dir.display()))?;
    let settings = Settings::load(&data_dir)?.with_env_overrides();

    match &cli.command {
        Command::Run(session) => commands::run(&data_dir, &settings, session).await,
        Command::Export {
            session,
            out_dir,
            no_manifest,
        } => commands::export(&data_dir, &settings, session, out_dir, !no_manifest).await,
        Command::Summary { session, audio_out } => {
            commands::summary(&data_dir, &settings, session, audio_out).await
        }
        Command::Summaries => commands::summaries(&data_dir),
        Command::Config { action } => commands::config(&data_dir, action),
        Command::Stats => commands::stats(&data_dir),
        Command::DebugLog => commands::debug_log(&data_dir),
        Command::TestConnection => commands::test_connection(&settings).await,
    }
}
