//! API Load Test Command Line Interface
//!
//! Drives the phase-based runner against a forms API and writes a
//! timestamped Markdown report when the run completes.

use anyhow::{Context, Result};
use clap::Parser;
use loadtest_metrics::MetricsCollector;
use loadtest_runner::{
    CancelSource, ConsoleSink, DataStore, LoadTestConfig, NoopStore, RunOrchestrator,
};
use loadtest_scenario::FormsWorkload;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "loadtest")]
#[command(about = "API load test runner", long_about = None)]
#[command(version)]
struct Cli {
    /// Path to a TOML configuration file
    #[arg(long, short = 'c')]
    config: Option<PathBuf>,

    /// Target API base URL (overrides configuration)
    #[arg(long)]
    base_url: Option<String>,

    /// Directory the final report is written to (overrides configuration)
    #[arg(long)]
    report_dir: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();

    let mut config = LoadTestConfig::load(cli.config.as_deref())
        .context("failed to load load test configuration")?;
    if let Some(base_url) = cli.base_url {
        config.base_url = base_url;
    }
    if let Some(report_dir) = cli.report_dir {
        config.report_dir = report_dir;
    }

    let rules = config
        .endpoint_rules()
        .context("invalid endpoint normalization rule")?;
    let metrics = Arc::new(MetricsCollector::new(rules));
    let store: Arc<dyn DataStore> = Arc::new(NoopStore);
    let workload = Arc::new(
        FormsWorkload::new(&config.base_url, Arc::clone(&metrics), Arc::clone(&store))
            .context("failed to build HTTP client")?,
    );

    let (cancel_source, cancel) = CancelSource::new();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("interrupt received, draining workers");
                cancel_source.cancel();
            }
            Err(err) => error!(%err, "failed to listen for shutdown signal"),
        }
    });

    let orchestrator = RunOrchestrator::new(
        config,
        metrics,
        workload,
        store,
        Arc::new(ConsoleSink),
    );
    let report_path = orchestrator.run(cancel).await?;
    info!(path = %report_path.display(), "run complete");
    Ok(())
}
