//! Change detection between the current run and the stored snapshot.

use crate::monitoring::RunReport;
use crate::store::Snapshot;

/// What, if anything, to tell the operator about this run
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// Healthy now and last time
    NoNotify,
    /// Errors present; repeated every run until fixed
    NotifyFailing { errors: usize, messages: Vec<String> },
    /// Healthy now after errors last time; sent once
    NotifyRecovered { previous_errors: usize, previous_messages: Vec<String> },
}

impl Decision {
    pub fn label(&self) -> &'static str {
        match self {
            Decision::NoNotify => "no-notify",
            Decision::NotifyFailing { .. } => "failing",
            Decision::NotifyRecovered { .. } => "recovered",
        }
    }
}

/// Decide from the current error count and the previous one.
///
/// A missing snapshot counts as zero previous errors.
pub fn decide(current: &RunReport, previous: Option<&Snapshot>) -> Decision {
    let errors = current.errors();
    if errors > 0 {
        return Decision::NotifyFailing { errors, messages: current.messages() };
    }

    match previous {
        Some(snapshot) if snapshot.errors > 0 => Decision::NotifyRecovered {
            previous_errors: snapshot.errors,
            previous_messages: snapshot.messages.clone(),
        },
        _ => Decision::NoNotify,
    }
}
