//! Lingo CLI entry point.

use anyhow::Result;
use clap::Parser;
use lingo::cli::{commands, Cli, Commands};
use lingo::config::Settings;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli
        .config
        .as_deref()
        .map(Settings::expand_path)
        .unwrap_or_else(Settings::default_config_path);
    let settings = Settings::load_from(Some(&config_path))?;

    // Initialize logging: -v flags win over the configured level, RUST_LOG over both
    let log_level = match cli.verbose {
        0 => settings.general.log_level.as_str(),
        1 => "debug",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| format!("lingo={},tower_http={}", log_level, log_level)),
        ))
        .with(tracing_subscriber::fmt::layer().with_target(false))
        .init();

    std::fs::create_dir_all(settings.data_dir())?;

    match cli.command {
        Commands::Serve { host, port } => {
            commands::run_serve(host, port, settings).await?;
        }

        Commands::Transcript { input, json } => {
            commands::run_transcript(&input, json, settings).await?;
        }

        Commands::Explain { word, sentence } => {
            commands::run_explain(&word, &sentence, settings).await?;
        }

        Commands::Doctor => {
            commands::run_doctor(&settings, &config_path)?;
        }

        Commands::Config { action } => {
            commands::run_config(&action, &settings, &config_path)?;
        }
    }

    Ok(())
}
