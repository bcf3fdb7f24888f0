//! Fleetsub hub daemon
//!
//! Loads a resource snapshot, reconciles every subscription into hub
//! Deployables, and keeps doing so on an interval until stopped.

use clap::Parser;
use fleetsub_hubd::{shutdown_signal, Daemon, DaemonConfig, DaemonResult};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Fleetsub hub daemon CLI
#[derive(Parser)]
#[command(name = "fleetsub-hubd")]
#[command(about = "Fleetsub hub daemon - subscription reconciliation", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "FLEETSUB_CONFIG")]
    config: Option<String>,

    /// Resource snapshot to load at startup
    #[arg(short, long, env = "FLEETSUB_SNAPSHOT")]
    snapshot: Option<PathBuf>,

    /// Run a single reconciliation pass and exit
    #[arg(long)]
    once: bool,

    /// Write the resulting resources here on exit
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "FLEETSUB_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "FLEETSUB_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> DaemonResult<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())?;

    // Override with CLI args
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }
    if let Some(path) = cli.snapshot {
        config.snapshot.path = Some(path);
    }
    if let Some(path) = cli.output {
        config.snapshot.output = Some(path);
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        once = cli.once,
        "Starting fleetsub hub daemon"
    );

    let daemon = Daemon::new(config).await?;
    if cli.once {
        let summary = daemon.run_once().await?;
        if summary.failed > 0 {
            tracing::warn!(failed = summary.failed, "Some subscriptions failed to reconcile");
        }
        Ok(())
    } else {
        daemon.run(shutdown_signal()).await
    }
}
