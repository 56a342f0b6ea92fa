//! Persistence of the previous run's outcome.

pub mod local;
pub mod remote;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use local::FileStore;
pub use remote::S3Store;

use crate::config::Config;
use crate::error::StoreError;
use crate::monitoring::RunReport;

pub const SNAPSHOT_VERSION: u32 = 1;

fn default_version() -> u32 {
    SNAPSHOT_VERSION
}

/// The part of a run report kept between runs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    /// When the run that produced this snapshot started
    pub time: DateTime<Utc>,

    /// Error count of that run
    pub errors: usize,

    /// One `<url>: <error>` line per error
    pub messages: Vec<String>,

    #[serde(default = "default_version")]
    pub version: u32,
}

impl From<&RunReport> for Snapshot {
    fn from(report: &RunReport) -> Self {
        Self {
            time: report.timestamp,
            errors: report.errors(),
            messages: report.messages(),
            version: SNAPSHOT_VERSION,
        }
    }
}

/// Where the snapshot lives between runs
#[async_trait]
pub trait StateStore: Send + Sync {
    /// Read the snapshot, `None` if nothing was stored yet
    async fn load(&self) -> Result<Option<Snapshot>, StoreError>;

    /// Replace the stored snapshot
    async fn save(&self, snapshot: &Snapshot) -> Result<(), StoreError>;

    /// Remove the stored snapshot; removing a missing one succeeds
    async fn delete(&self) -> Result<(), StoreError>;

    /// Human readable location for logs
    fn location(&self) -> String;
}

/// Build the configured store: S3 when its credentials are present, else the
/// local file when one is set, else none.
pub fn from_config(config: &Config) -> Result<Option<Box<dyn StateStore>>, StoreError> {
    if let Some(s3_config) = &config.s3 {
        return Ok(Some(Box::new(S3Store::new(s3_config)?)));
    }

    Ok(config
        .state_file
        .as_ref()
        .map(|path| Box::new(FileStore::new(path.clone())) as Box<dyn StateStore>))
}
