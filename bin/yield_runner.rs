//! # Yield Runner
//!
//! One-shot runner for the MIG Yield SDK: runs the configured adapters and
//! prints every collected pool record as a JSON array on stdout. Logs go to
//! stderr.
//!
//! ## Usage
//!
//! ```bash
//! cargo run --bin yield_runner -- --project segment-finance --json-logs
//! ```
//!
//! Exits with an error when any selected project failed, after printing the
//! pools of the projects that succeeded.

use anyhow::{anyhow, Result};
use clap::Parser;
use mig_yield_sdk::{metrics, orchestrator::Orchestrator, settings::Settings, YieldPool};
use std::path::PathBuf;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Debug, Parser)]
#[command(name = "yield_runner", about = "Collect yield pool records from the configured protocols")]
struct Args {
    /// Settings file (defaults to Config.toml in the working directory)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Restrict the run to these projects (repeatable)
    #[arg(long = "project")]
    projects: Vec<String>,

    /// Emit logs as JSON lines
    #[arg(long)]
    json_logs: bool,
}

fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| "mig_yield_sdk=info,yield_runner=info".into());
    let registry = tracing_subscriber::registry().with(filter);
    if json {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    let args = Args::parse();
    init_logging(args.json_logs);

    #[cfg(feature = "observability")]
    let prometheus = metrics_exporter_prometheus::PrometheusBuilder::new().install_recorder()?;
    metrics::describe_metrics();

    let mut settings = match &args.config {
        Some(path) => Settings::from_path(path)?,
        None => Settings::new()?,
    };
    if !args.projects.is_empty() {
        settings.runner.projects = args.projects.clone();
    }
    info!(projects = ?settings.runner.projects, "settings loaded");

    let orchestrator = Orchestrator::from_settings(&settings)?;
    let mut pools: Vec<YieldPool> = Vec::new();
    let mut failed = Vec::new();
    for (project, result) in orchestrator.run_all().await {
        match result {
            Ok(project_pools) => pools.extend(project_pools),
            Err(e) => {
                error!(project, error = %e, "project failed");
                failed.push(project);
            }
        }
    }

    println!("{}", serde_json::to_string_pretty(&pools)?);

    #[cfg(feature = "observability")]
    eprintln!("{}", prometheus.render());

    if failed.is_empty() {
        Ok(())
    } else {
        Err(anyhow!("{} project(s) failed: {}", failed.len(), failed.join(", ")))
    }
}
