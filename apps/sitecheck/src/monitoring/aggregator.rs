use std::sync::Arc;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use tracing::info;

use super::executor::CheckExecutor;
use super::types::{RunReport, Target};

/// Aggregator - checks every target and collects a `RunReport`
pub struct Aggregator {
    executor: Arc<CheckExecutor>,
    concurrency: usize,
}

impl Aggregator {
    /// Check one target at a time
    pub fn new(executor: Arc<CheckExecutor>) -> Self {
        Self { executor, concurrency: 1 }
    }

    /// Allow up to `concurrency` checks in flight; zero is treated as one
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Check all targets. Results keep the order of `targets`.
    pub async fn run(&self, targets: &[Target]) -> RunReport {
        let started = Utc::now();
        info!(targets = targets.len(), concurrency = self.concurrency, "Checking sites");

        // `buffered` yields in input order regardless of completion order
        let results = stream::iter(targets)
            .map(|target| self.executor.execute_check(target))
            .buffered(self.concurrency)
            .collect::<Vec<_>>()
            .await;

        let report = RunReport::new(started, results);
        let elapsed = Utc::now() - started;
        info!(
            "Checked {} site(s) in {:.2}s; {} failing with {} error(s)",
            report.results.len(),
            elapsed.num_milliseconds() as f64 / 1000.0,
            report.failed_targets(),
            report.errors()
        );

        report
    }
}
