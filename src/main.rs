//! Verbatim CLI entry point.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use verbatim::cli::{commands, Cli, Commands};
use verbatim::config::Settings;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let config_path = cli.config.as_ref().map(PathBuf::from);
    let settings = Settings::load_from(config_path.as_ref())?;

    // Initialize logging
    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| settings.log_filter(cli.verbose)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    // Execute command
    match &cli.command {
        Commands::Analyze {
            guide,
            transcripts,
            output,
            no_store,
        } => {
            commands::run_analyze(guide, transcripts, output.as_deref(), *no_store, settings).await?;
        }

        Commands::Segment { file, text } => {
            commands::run_segment(file, *text, settings).await?;
        }

        Commands::Retrieve { file, question } => {
            commands::run_retrieve(file, question, settings).await?;
        }

        Commands::Runs => {
            commands::run_runs(settings)?;
        }

        Commands::Show { run_id, json } => {
            commands::run_show(run_id, *json, settings)?;
        }

        Commands::Config { action } => {
            commands::run_config(action, settings, config_path)?;
        }
    }

    Ok(())
}
