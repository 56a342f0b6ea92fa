use std::fmt::Write as _;

use tracing::{error, info, warn};

use crate::detector::{Decision, decide};
use crate::error::StoreError;
use crate::monitoring::{Aggregator, RunReport, Target};
use crate::notify::{DispatchSummary, Notifier};
use crate::store::{Snapshot, StateStore};

/// Per-invocation switches
#[derive(Debug, Clone, Copy, Default)]
pub struct RunOptions {
    /// Send notifications and persist state
    pub ci: bool,
    /// Print per-target results to stdout
    pub verbose: bool,
}

/// What one run did
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    /// `None` outside CI mode
    pub decision: Option<Decision>,
    pub dispatch: DispatchSummary,
    pub persisted: bool,
}

impl RunOutcome {
    pub fn exit_code(&self) -> u8 {
        self.report.exit_code()
    }
}

/// Check, compare, notify, persist
pub struct Runner {
    aggregator: Aggregator,
    notifier: Notifier,
    store: Option<Box<dyn StateStore>>,
}

impl Runner {
    pub fn new(aggregator: Aggregator, notifier: Notifier, store: Option<Box<dyn StateStore>>) -> Self {
        Self { aggregator, notifier, store }
    }

    pub async fn run(&self, targets: &[Target], options: RunOptions) -> RunOutcome {
        let report = self.aggregator.run(targets).await;

        if options.verbose {
            print!("{}", render_report(&report));
        }

        if !options.ci {
            info!("Not in CI mode, skipping notifications and state");
            return RunOutcome {
                report,
                decision: None,
                dispatch: DispatchSummary::default(),
                persisted: false,
            };
        }

        let previous = self.load_previous().await;
        let decision = decide(&report, previous.as_ref());
        info!(decision = decision.label(), errors = report.errors(), "Change detection complete");

        let dispatch = self.notifier.notify(&decision).await;
        let persisted = self.persist(&report).await;

        RunOutcome { report, decision: Some(decision), dispatch, persisted }
    }

    /// Remove the stored snapshot
    pub async fn reset(&self) -> Result<(), StoreError> {
        reset(self.store.as_deref()).await
    }

    /// A failed read is treated as no previous run, so failures still notify
    async fn load_previous(&self) -> Option<Snapshot> {
        let store = self.store.as_ref()?;

        match store.load().await {
            Ok(Some(snapshot)) => {
                info!(
                    "Last run had {} error(s) at {}",
                    snapshot.errors,
                    snapshot.time.format("%Y-%m-%d %H:%M:%S UTC")
                );
                Some(snapshot)
            }
            Ok(None) => {
                info!(location = %store.location(), "No previous snapshot");
                None
            }
            Err(e) => {
                warn!(location = %store.location(), "Failed to read previous snapshot: {}", e);
                None
            }
        }
    }

    async fn persist(&self, report: &RunReport) -> bool {
        let Some(store) = &self.store else {
            warn!("No state store configured, results not saved");
            return false;
        };

        match store.save(&Snapshot::from(report)).await {
            Ok(()) => true,
            Err(e) => {
                error!(location = %store.location(), "Failed to save snapshot: {}", e);
                false
            }
        }
    }
}

/// Remove the stored snapshot without running any checks
pub async fn reset(store: Option<&dyn StateStore>) -> Result<(), StoreError> {
    let Some(store) = store else {
        warn!("No state store configured, nothing to delete");
        return Ok(());
    };

    store.delete().await?;
    info!(location = %store.location(), "Deleted stored snapshot");
    Ok(())
}

/// Human readable per-target listing
pub fn render_report(report: &RunReport) -> String {
    let mut out = String::new();

    for result in &report.results {
        let status = result.status_code.map_or_else(|| "---".to_string(), |code| code.to_string());
        let verdict = if result.is_success() { "ok  " } else { "FAIL" };
        let _ = write!(out, "{} {} {}", verdict, status, result.url);
        if let Some(days) = result.days_until_expiry {
            let _ = write!(out, " (cert {} days)", days);
        }
        if !result.is_success() {
            let _ = write!(out, ": {}", result.error_message());
        }
        out.push('\n');
    }

    let _ = writeln!(
        out,
        "Done. {} site(s) checked; found {} error(s)",
        report.results.len(),
        report.errors()
    );
    out
}
