/// Monitoring module - probes targets and collects the results of one run
///
/// This module is responsible for:
/// - Requesting each target and reading its certificate expiry
/// - Evaluating responses against the target's expectations
/// - Collecting results into a run report, in target order
pub mod aggregator;
pub mod certificate;
pub mod checker;
pub mod executor;
pub mod types;

pub use aggregator::Aggregator;
pub use checker::{HttpProber, ProbeResponse, Prober};
pub use executor::CheckExecutor;
pub use types::{CheckResult, Failure, RunReport, Target};
