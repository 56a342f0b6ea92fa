use std::io::Error as IoError;
use std::path::PathBuf;

use thiserror::Error;

/// Failure to assemble the list of targets
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Sites file path unavailable: set XDG_CONFIG_HOME or HOME")]
    PathUnavailable,
    #[error("Failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: IoError,
    },
    #[error("Failed to parse sites file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("Invalid target URL {url}: {reason}")]
    InvalidUrl { url: String, reason: String },
    #[error("Invalid contents pattern for {url}: {source}")]
    InvalidPattern {
        url: String,
        #[source]
        source: regex::Error,
    },
    #[error("Invalid certificate threshold for {url}: {days} days")]
    InvalidThreshold { url: String, days: i64 },
    #[error("No targets configured")]
    NoTargets,
}

/// Failure of the HTTP/TLS probe for a single target
#[derive(Debug, Error)]
pub enum ProbeError {
    #[error("{0}")]
    Request(String),
    #[error("{0}")]
    Timeout(String),
    #[error("TLS handshake failed: {0}")]
    Tls(String),
    #[error("Certificate unreadable: {0}")]
    Certificate(String),
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

/// Failure to read, write or remove the persisted snapshot
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("S3 request failed: {0}")]
    S3(#[from] s3::error::S3Error),
    #[error("S3 returned status {0}")]
    Status(u16),
    #[error("State store misconfigured: {0}")]
    Config(String),
    #[error("{0:#}")]
    Io(#[from] IoError),
    #[error("Snapshot is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Failure of a notification channel
#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("{channel} request failed: {source}")]
    Request {
        channel: &'static str,
        #[source]
        source: reqwest::Error,
    },
    #[error("{channel} returned status {status}: {body}")]
    Status { channel: &'static str, status: u16, body: String },
}
