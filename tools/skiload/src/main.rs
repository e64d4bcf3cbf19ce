use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use skiload_core::{RunConfig, RunCoordinator};
use skiload_sdk::{HttpSkiersClient, MockSkiersClient, SkiersApi};
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum Mode {
    /// Send requests to `hostAddress`.
    Http,
    /// Answer every call in-process after a fixed delay.
    Mock,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Pretty,
    Json,
}

#[derive(Debug, Parser)]
#[command(author, version, about = "Phased load generator for the ski resort API", long_about = None)]
struct Args {
    /// Properties file with maxThreads, resort, hostAddress and optional keys
    #[arg(long, default_value = "arguments.properties")]
    config: PathBuf,

    /// Where requests go
    #[arg(long, value_enum, default_value_t = Mode::Http)]
    mode: Mode,

    /// Simulated call latency in mock mode
    #[arg(long, default_value_t = 5)]
    mock_latency_ms: u64,

    /// Optional path for a JSON copy of the final statistics
    #[arg(long)]
    report: Option<PathBuf>,

    /// Log filter used when RUST_LOG is unset
    #[arg(long, default_value = "info")]
    log_level: String,

    #[arg(long, value_enum, default_value_t = LogFormat::Pretty)]
    log_format: LogFormat,
}

fn init_logging(args: &Args) -> Result<()> {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));

    match args.log_format {
        LogFormat::Json => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .try_init(),
        LogFormat::Pretty => tracing_subscriber::registry()
            .with(filter)
            .with(tracing_subscriber::fmt::layer().pretty().with_writer(std::io::stderr))
            .try_init(),
    }
    .context("install tracing subscriber")
}

fn build_client(args: &Args, config: &RunConfig) -> Result<Arc<dyn SkiersApi>> {
    match args.mode {
        Mode::Http => {
            let client = HttpSkiersClient::new(&config.host_address, config.request_timeout)
                .with_context(|| format!("build HTTP client for {}", config.host_address))?;
            Ok(Arc::new(client))
        }
        Mode::Mock => Ok(Arc::new(MockSkiersClient::new(Duration::from_millis(
            args.mock_latency_ms,
        )))),
    }
}

fn write_report(path: &Path, json: &str) -> Result<()> {
    fs::write(path, json).with_context(|| format!("write report to {}", path.display()))
}

fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(&args)?;

    let config = RunConfig::load(&args.config)
        .with_context(|| format!("load configuration from {}", args.config.display()))?;
    let client = build_client(&args, &config)?;
    info!(mode = ?args.mode, client = client.name(), "client ready");

    let coordinator = RunCoordinator::new(config, client).context("build phase schedule")?;
    let outcome = coordinator.run().context("load run failed")?;

    println!();
    print!("{}", outcome.report);
    println!("Records: {}", outcome.csv_path.display());
    match &outcome.histogram_path {
        Some(path) => println!("Request-start histogram: {}", path.display()),
        None => warn!("request-start histogram was not written"),
    }

    if let Some(path) = &args.report {
        let json = outcome
            .report
            .to_json_pretty()
            .context("serialize run report")?;
        write_report(path, &json)?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}
