//! OxiRotate Daemon - log rotation for managed processes

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod cron;
mod daemon;
mod lister;
mod scheduler;
mod targets;

use daemon::{Daemon, DaemonOptions};

#[derive(Parser)]
#[command(name = "oxirotated")]
#[command(version, about = "Rotate and prune the logs of managed processes")]
struct Cli {
    /// Config file (default: first oxirotate.{toml,yaml,yml,json} in the root)
    #[arg(short, long, env = "OXIROTATE_CONFIG")]
    config: Option<PathBuf>,

    /// Process manager home holding `logs/` and the system logs
    /// (default: root_path from the config, else $OXIROTATE_ROOT, else ~/.oxidepm)
    #[arg(short, long)]
    root: Option<PathBuf>,

    /// Increase verbosity (-v, -vv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = match cli.verbose {
        0 => "oxirotated=info,oxirotate_logs=info".to_string(),
        1 => "oxirotated=debug,oxirotate_logs=debug,oxirotate_notify=debug".to_string(),
        _ => "trace".to_string(),
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("OxiRotate Daemon starting...");

    let daemon = Daemon::new(DaemonOptions {
        config_path: cli.config,
        root: cli.root,
    })?;

    let mut sigterm = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())?;
    let mut sigint = tokio::signal::unix::signal(tokio::signal::unix::SignalKind::interrupt())?;

    tokio::select! {
        _ = daemon.run() => {
            error!("All triggers stopped");
        }
        _ = sigterm.recv() => {
            info!("Received SIGTERM, shutting down...");
        }
        _ = sigint.recv() => {
            info!("Received SIGINT, shutting down...");
        }
    }

    let gauges = daemon.gauges();
    info!(
        "Daemon shutdown complete ({} files, {} bytes in log dir)",
        gauges.file_count(),
        gauges.total_bytes()
    );
    Ok(())
}
