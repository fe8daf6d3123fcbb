//! Signal execution pipeline demo binary
//!
//! Runs the pipeline against the bundled synthetic feeds: signals are
//! generated, prioritized, gated, and dispatched while the loop below
//! reports status until Ctrl-C.

// Compiler warning configuration
#![deny(unused_imports)]
#![deny(unused_mut)]
#![deny(unused_variables)]
#![warn(dead_code)]
#![warn(unused_must_use)]

use anyhow::{Context, Result};
use clap::Parser;
use sigflow::{ExecutionPipeline, PipelineConfig};
use tracing::{debug, info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Command line arguments
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Override the configured worker count
    #[arg(short, long)]
    workers: Option<usize>,

    /// Seconds between status reports
    #[arg(long, default_value = "10")]
    status_interval: u64,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.verbose)?;

    info!("🚀 Starting signal execution pipeline");
    info!("Version: {}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config(&args.config)?;
    if let Some(workers) = args.workers {
        config.workers.count = workers;
    }
    info!("⚙️ Workers: {}", config.worker_count());

    let pipeline = ExecutionPipeline::new(config);

    pipeline.on_execution(|result| {
        if result.success {
            debug!(
                signal_id = %result.signal_id,
                venue = result.venue.as_deref().unwrap_or("-"),
                latency_us = result.execution_latency_us,
                "execution confirmed"
            );
        }
        Ok(())
    });
    pipeline.on_error(|context, message| {
        warn!(context, message, "pipeline error");
    });

    pipeline.start().context("Failed to start the pipeline")?;
    info!("✅ Pipeline running, press Ctrl-C to stop");

    run_status_loop(&pipeline, args.status_interval).await?;

    info!("🛑 Shutting down");
    pipeline.stop();
    info!("{}", pipeline.status_report());

    Ok(())
}

/// Initialize logging subsystem
fn init_logging(verbose: bool) -> Result<()> {
    let env_filter = if verbose {
        "sigflow=debug,info"
    } else {
        "sigflow=info,warn,error"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| env_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();

    Ok(())
}

/// Load configuration from file with fallback to defaults
fn load_config(path: &str) -> Result<PipelineConfig> {
    if std::path::Path::new(path).exists() {
        PipelineConfig::from_file_with_env(path)
            .with_context(|| format!("Failed to load config from {}", path))
    } else {
        warn!("Config file '{}' not found, using defaults", path);
        Ok(PipelineConfig::default())
    }
}

/// Report status and refresh the pre-signed pools until Ctrl-C.
async fn run_status_loop(pipeline: &ExecutionPipeline, status_interval: u64) -> Result<()> {
    let mut status_tick =
        tokio::time::interval(tokio::time::Duration::from_secs(status_interval.max(1)));
    let mut refresh_tick = tokio::time::interval(tokio::time::Duration::from_secs(15));

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl-C received");
                return Ok(());
            }
            _ = status_tick.tick() => {
                info!("📊 {}", pipeline.status_report());
                let status = pipeline.status();
                debug!(status = %serde_json::to_string(&status)?, "status snapshot");
            }
            _ = refresh_tick.tick() => {
                let outcome = pipeline.refresh_presigned();
                if outcome.dropped > 0 || outcome.refilled > 0 {
                    debug!(
                        dropped = outcome.dropped,
                        refilled = outcome.refilled,
                        "pre-signed pools refreshed"
                    );
                }
            }
        }
    }
}
