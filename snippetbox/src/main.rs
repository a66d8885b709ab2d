//! Snippetbox server binary entry point.

use clap::Parser;
use snippetbox::config::{AppConfig, LogFormat, Overrides};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Snippet sharing web server
#[derive(Debug, Parser)]
#[command(name = "snippetbox", version, about)]
struct Cli {
    #[command(flatten)]
    overrides: Overrides,

    /// Extra configuration file
    #[arg(long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let loaded = AppConfig::load(cli.config.as_deref());
    let format = loaded
        .as_ref()
        .map(|config| config.log.format)
        .unwrap_or_default();

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "snippetbox=info,tower_http=info".into());
    match format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer())
            .init(),
    }

    // Load configuration
    let config = loaded
        .unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", *e);
            AppConfig::default()
        })
        .with_overrides(cli.overrides);

    if config.debug {
        tracing::warn!("Debug mode: error details are sent to clients");
    }

    snippetbox::server::run(config).await
}
