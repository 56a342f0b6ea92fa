use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Expected HTTP status when a target does not name one
pub const DEFAULT_STATUS: u16 = 200;

/// Days before certificate expiry at which a target starts failing
pub const DEFAULT_MIN_CERT_DAYS: i64 = 14;

fn default_status() -> u16 {
    DEFAULT_STATUS
}

/// A configured endpoint to check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    /// URL requested with a single GET, redirects not followed
    pub url: String,

    /// HTTP status the response must carry
    #[serde(default = "default_status", rename = "status")]
    pub expected_status: u16,

    /// Per-target override of the certificate expiry threshold
    #[serde(default)]
    pub min_cert_days: Option<i64>,

    /// Expected `Location` header, only checked for redirect responses
    #[serde(default)]
    pub redirect: Option<String>,

    /// Regular expression the body must match, only checked for 200 responses
    #[serde(default)]
    pub contents: Option<String>,
}

impl Target {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            expected_status: DEFAULT_STATUS,
            min_cert_days: None,
            redirect: None,
            contents: None,
        }
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.expected_status = status;
        self
    }

    pub fn with_min_cert_days(mut self, days: i64) -> Self {
        self.min_cert_days = Some(days);
        self
    }

    pub fn with_redirect(mut self, location: impl Into<String>) -> Self {
        self.redirect = Some(location.into());
        self
    }

    pub fn with_contents(mut self, pattern: impl Into<String>) -> Self {
        self.contents = Some(pattern.into());
        self
    }

    pub fn is_https(&self) -> bool {
        self.url
            .get(..8)
            .is_some_and(|scheme| scheme.eq_ignore_ascii_case("https://"))
    }
}

/// One reason a target failed its check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Failure {
    /// Connection, TLS or timeout error before a response arrived
    Unreachable { reason: String },
    StatusMismatch { expected: u16, received: u16 },
    RedirectMismatch { expected: String, received: Option<String> },
    ContentMismatch { pattern: String },
    CertificateUnavailable { reason: String },
    CertificateExpired { days_ago: i64 },
    CertificateExpiringSoon { days_left: i64 },
}

impl std::fmt::Display for Failure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Failure::Unreachable { reason } => write!(f, "request failed: {}", reason),
            Failure::StatusMismatch { expected, received } => {
                write!(f, "expected response code {} received {}", expected, received)
            }
            Failure::RedirectMismatch { expected, received } => write!(
                f,
                "expected redirect {} received {}",
                expected,
                received.as_deref().unwrap_or("none")
            ),
            Failure::ContentMismatch { pattern } => write!(f, "expected contents {}", pattern),
            Failure::CertificateUnavailable { reason } => {
                write!(f, "SSL certificate check failed: {}", reason)
            }
            Failure::CertificateExpired { days_ago } => {
                write!(f, "SSL certificate expired {} days ago", days_ago)
            }
            Failure::CertificateExpiringSoon { days_left } => {
                write!(f, "SSL certificate expires in {} days", days_left)
            }
        }
    }
}

/// Outcome of checking one target
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    /// URL of the target that was checked
    pub url: String,

    /// When the check was performed
    pub timestamp: DateTime<Utc>,

    /// HTTP status code, `None` if no response arrived
    pub status_code: Option<u16>,

    /// Everything that went wrong, empty on success
    pub failures: Vec<Failure>,

    /// Peer certificate `notAfter`, HTTPS only
    pub cert_expiry: Option<DateTime<Utc>>,

    /// Whole days left on the certificate at `timestamp`
    pub days_until_expiry: Option<i64>,
}

impl CheckResult {
    pub fn new(url: String, timestamp: DateTime<Utc>) -> Self {
        Self {
            url,
            timestamp,
            status_code: None,
            failures: Vec::new(),
            cert_expiry: None,
            days_until_expiry: None,
        }
    }

    pub fn with_failure(mut self, failure: Failure) -> Self {
        self.failures.push(failure);
        self
    }

    /// Record the certificate expiry and derive the days remaining
    pub fn with_certificate(mut self, expiry: DateTime<Utc>) -> Self {
        self.cert_expiry = Some(expiry);
        self.days_until_expiry = Some((expiry - self.timestamp).num_days());
        self
    }

    pub fn is_success(&self) -> bool {
        self.failures.is_empty()
    }

    /// Failures joined into one line, empty on success
    pub fn error_message(&self) -> String {
        self.failures
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; ")
    }

    /// Probe failures plus certificate failures
    pub fn error_count(&self) -> usize {
        self.failures.len()
    }

    /// One `<url>: <error>` line per failure
    pub fn messages(&self) -> impl Iterator<Item = String> + '_ {
        self.failures.iter().map(|failure| format!("{}: {}", self.url, failure))
    }
}

/// Every check result of a single invocation, in target order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunReport {
    pub timestamp: DateTime<Utc>,
    pub results: Vec<CheckResult>,
}

impl RunReport {
    pub fn new(timestamp: DateTime<Utc>, results: Vec<CheckResult>) -> Self {
        Self { timestamp, results }
    }

    pub fn errors(&self) -> usize {
        self.results.iter().map(CheckResult::error_count).sum()
    }

    pub fn messages(&self) -> Vec<String> {
        self.results.iter().flat_map(|result| result.messages()).collect()
    }

    /// Targets with at least one failure
    pub fn failed_targets(&self) -> usize {
        self.results.iter().filter(|result| !result.is_success()).count()
    }

    /// Process exit status: the error count, saturated at 255
    pub fn exit_code(&self) -> u8 {
        u8::try_from(self.errors()).unwrap_or(u8::MAX)
    }
}
