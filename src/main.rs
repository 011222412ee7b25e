//! Command-line entry point for the balance probe.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use chain_probe::config::loader::load_config;
use chain_probe::config::{Mode, ProbeConfig};
use chain_probe::{Dispatcher, ScanOrchestrator, Shutdown};

#[derive(Debug, Parser)]
#[command(name = "chain-probe", version, about = "Wallet-credential balance probe")]
struct Args {
    /// Path to a TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Operating mode: test (default) or live.
    #[arg(short, long)]
    mode: Option<Mode>,

    /// Number of candidates to scan.
    #[arg(short, long)]
    target_scans: Option<usize>,

    /// Wall-clock deadline for the run, in seconds.
    #[arg(short, long)]
    deadline_secs: Option<u64>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Precedence: file < environment < command line.
    let mut config = match &args.config {
        Some(path) => load_config(path)
            .with_context(|| format!("loading config from {}", path.display()))?,
        None => ProbeConfig::default(),
    };

    // RUST_LOG wins over the configured level.
    let default_filter = format!("chain_probe={}", config.observability.log_level);
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    config.apply_env_overrides();
    if let Some(mode) = args.mode {
        config.mode = mode;
    }
    if let Some(target) = args.target_scans {
        config.scan.target_scans = target;
    }
    if let Some(secs) = args.deadline_secs {
        config.scan.run_deadline_secs = Some(secs);
    }
    if let Err(errors) = chain_probe::config::validation::validate_config(&config) {
        for error in &errors {
            tracing::error!(field = %error.field, "Invalid configuration: {}", error.message);
        }
        anyhow::bail!("configuration validation failed ({} problems)", errors.len());
    }

    match config.mode {
        Mode::Live => tracing::warn!(
            target_scans = config.scan.target_scans,
            "LIVE mode: real balance services will be queried"
        ),
        Mode::Test => tracing::info!(
            target_scans = config.scan.target_scans,
            "Test mode: all queries are mocked"
        ),
    }

    let shutdown = Arc::new(Shutdown::new());
    let signal_target = Arc::clone(&shutdown);
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, cancelling scan");
            signal_target.trigger();
        }
    });

    let config = Arc::new(config);
    let dispatcher = Dispatcher::from_config(&config).context("building dispatcher")?;
    let orchestrator = ScanOrchestrator::new(Arc::clone(&config), dispatcher, shutdown);

    let report = orchestrator.run_scan().await.context("scan run failed")?;
    let summary = report.summary();
    tracing::info!(
        completed = summary.completed,
        cancelled = summary.cancelled,
        ok = summary.queries.ok,
        not_found = summary.queries.not_found,
        rate_limited = summary.queries.rate_limited,
        errors = summary.queries.error,
        mocked = summary.queries.mocked,
        "Run summary"
    );
    println!("{}", serde_json::to_string_pretty(&summary)?);

    Ok(())
}
