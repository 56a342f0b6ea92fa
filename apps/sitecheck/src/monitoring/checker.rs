use std::error::Error as StdError;
use std::time::Duration;

use chrono::{DateTime, Utc};
use reqwest::header::LOCATION;
use reqwest::redirect::Policy;
use tracing::debug;

use super::certificate::peer_certificate_expiry;
use super::types::Target;
use crate::error::ProbeError;

/// Default per-request timeout in seconds
pub const DEFAULT_TIMEOUT_SECONDS: u64 = 10;

/// Only this much of a body is kept for the contents check
pub const MAX_BODY_BYTES: usize = 1024 * 1024;

/// What a target answered with
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status_code: u16,

    /// `Location` header, if any
    pub location: Option<String>,

    /// Response body, only fetched when the target expects contents
    pub body: Option<String>,
}

/// HTTP/TLS capability used by the check executor
#[async_trait::async_trait]
pub trait Prober: Send + Sync {
    /// Request the target URL once, without following redirects
    async fn fetch(&self, target: &Target) -> Result<ProbeResponse, ProbeError>;

    /// Expiry of the certificate the target host presents
    async fn certificate_expiry(&self, target: &Target) -> Result<DateTime<Utc>, ProbeError>;
}

/// Prober backed by reqwest and native-tls
pub struct HttpProber {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProber {
    pub fn new(timeout_seconds: u64) -> Result<Self, ProbeError> {
        let timeout = Duration::from_secs(timeout_seconds);
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(Policy::none())
            .user_agent(concat!("sitecheck/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ProbeError::Request(describe(&e)))?;

        Ok(Self { client, timeout })
    }
}

#[async_trait::async_trait]
impl Prober for HttpProber {
    async fn fetch(&self, target: &Target) -> Result<ProbeResponse, ProbeError> {
        let response = self.client.get(&target.url).send().await.map_err(|e| self.request_error(e))?;

        let status_code = response.status().as_u16();
        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string);
        debug!(url = %target.url, status_code, ?location, "Received response");

        let body = if target.contents.is_some() && response.status().is_success() {
            Some(self.read_body(response).await?)
        } else {
            None
        };

        Ok(ProbeResponse { status_code, location, body })
    }

    async fn certificate_expiry(&self, target: &Target) -> Result<DateTime<Utc>, ProbeError> {
        peer_certificate_expiry(&target.url, self.timeout).await
    }
}

impl HttpProber {
    /// Read at most `MAX_BODY_BYTES`, decoding invalid UTF-8 lossily
    async fn read_body(&self, mut response: reqwest::Response) -> Result<String, ProbeError> {
        let mut body = Vec::new();

        while let Some(chunk) = response.chunk().await.map_err(|e| self.request_error(e))? {
            let room = MAX_BODY_BYTES - body.len();
            body.extend_from_slice(&chunk[..chunk.len().min(room)]);
            if body.len() == MAX_BODY_BYTES {
                break;
            }
        }

        Ok(String::from_utf8_lossy(&body).into_owned())
    }

    fn request_error(&self, error: reqwest::Error) -> ProbeError {
        if error.is_timeout() {
            ProbeError::Timeout(format!("timed out after {}s", self.timeout.as_secs()))
        } else if is_tls_error(&error) {
            ProbeError::Tls(describe(&error))
        } else {
            ProbeError::Request(describe(&error))
        }
    }
}

/// Whether the handshake itself failed, e.g. on an expired or untrusted chain
fn is_tls_error(error: &reqwest::Error) -> bool {
    let mut source = error.source();
    while let Some(cause) = source {
        if cause.downcast_ref::<native_tls::Error>().is_some() {
            return true;
        }
        source = cause.source();
    }
    false
}

/// reqwest hides the root cause (refused, DNS, TLS) in its source chain
fn describe(error: &reqwest::Error) -> String {
    let mut message = error.to_string();
    let mut source = error.source();
    while let Some(cause) = source {
        message.push_str(": ");
        message.push_str(&cause.to_string());
        source = cause.source();
    }
    message
}
