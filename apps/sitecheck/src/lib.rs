//! Website availability and certificate checks with change-gated
//! notifications.

pub mod config;
pub mod detector;
pub mod error;
pub mod monitoring;
pub mod notify;
pub mod runner;
pub mod store;

pub use config::{Config, Sites};
pub use detector::{Decision, decide};
pub use runner::{RunOptions, RunOutcome, Runner};
