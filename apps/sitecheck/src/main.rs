#![warn(clippy::all, clippy::pedantic)]

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::debug;

use sitecheck::monitoring::checker::DEFAULT_TIMEOUT_SECONDS;
use sitecheck::monitoring::{Aggregator, CheckExecutor, HttpProber};
use sitecheck::notify::Notifier;
use sitecheck::{Config, RunOptions, Runner, Sites, runner, store};

/// Check websites are online and hold valid, not-expiring-soon SSL certificates
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// CI mode: send notifications and persist results
    #[arg(long)]
    ci: bool,

    /// Print per-site results
    #[arg(short, long)]
    verbose: bool,

    /// Delete the stored results and exit
    #[arg(short, long)]
    delete: bool,

    /// Sites file (TOML)
    #[arg(short, long, value_name = "PATH")]
    sites: Option<PathBuf>,

    /// Number of sites checked at once
    #[arg(short, long, default_value_t = 1)]
    jobs: usize,

    /// Per-request timeout in seconds, for checks and notifications
    #[arg(long, value_name = "SECONDS", default_value_t = DEFAULT_TIMEOUT_SECONDS)]
    timeout: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<ExitCode> {
    dotenvy::dotenv().ok();
    logger::init_tracing();

    let cli = Cli::parse();
    let config = Config::from_env();
    debug!("{config}");

    let store = store::from_config(&config).context("Failed to set up state store")?;

    if cli.delete {
        runner::reset(store.as_deref()).await.context("Failed to delete stored results")?;
        return Ok(ExitCode::SUCCESS);
    }

    let sites = Sites::from_path(cli.sites.as_ref()).context("Failed to load sites")?;

    let prober = Arc::new(HttpProber::new(cli.timeout)?);
    let executor = CheckExecutor::new(prober).with_default_min_cert_days(sites.default_min_cert_days);
    let aggregator = Aggregator::new(Arc::new(executor)).with_concurrency(cli.jobs);
    let notifier = Notifier::from_config(&config, Duration::from_secs(cli.timeout))
        .context("Failed to set up notification channels")?;
    let runner = Runner::new(aggregator, notifier, store);

    let outcome = runner.run(&sites.targets, RunOptions { ci: cli.ci, verbose: cli.verbose }).await;

    Ok(ExitCode::from(outcome.exit_code()))
}
