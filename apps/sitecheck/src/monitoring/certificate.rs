use std::time::Duration;

use chrono::{DateTime, Utc};
use native_tls::TlsConnector;
use tokio::net::TcpStream;
use tokio::time::timeout;
use url::Url;
use x509_parser::parse_x509_certificate;

use crate::error::ProbeError;

/// Connect to the URL's host and read the `notAfter` of the leaf certificate.
///
/// Chain validation is disabled so an expired or self-signed certificate
/// still yields its date. The prober's HTTP request validates normally, and a
/// handshake it rejects is followed up here to tell expiry apart from other
/// TLS problems.
pub async fn peer_certificate_expiry(url: &str, limit: Duration) -> Result<DateTime<Utc>, ProbeError> {
    let parsed = Url::parse(url).map_err(|e| ProbeError::InvalidUrl(e.to_string()))?;
    let host = parsed
        .host_str()
        .map(|host| host.trim_start_matches('[').trim_end_matches(']').to_string())
        .ok_or_else(|| ProbeError::InvalidUrl(format!("{} has no host", url)))?;
    let port = parsed.port_or_known_default().unwrap_or(443);

    let connector = TlsConnector::builder()
        .danger_accept_invalid_certs(true)
        .build()
        .map_err(|e| ProbeError::Tls(e.to_string()))?;
    let connector = tokio_native_tls::TlsConnector::from(connector);

    let stream = timeout(limit, TcpStream::connect((host.as_str(), port)))
        .await
        .map_err(|_| ProbeError::Timeout(format!("connection to {}:{} timed out", host, port)))?
        .map_err(|e| ProbeError::Tls(e.to_string()))?;

    let tls_stream = timeout(limit, connector.connect(&host, stream))
        .await
        .map_err(|_| ProbeError::Timeout(format!("TLS handshake with {} timed out", host)))?
        .map_err(|e| ProbeError::Tls(e.to_string()))?;

    let cert = tls_stream
        .get_ref()
        .peer_certificate()
        .map_err(|e| ProbeError::Certificate(e.to_string()))?
        .ok_or_else(|| ProbeError::Certificate("no certificate presented".to_string()))?;
    let der = cert.to_der().map_err(|e| ProbeError::Certificate(e.to_string()))?;

    not_after_from_der(&der)
}

/// `notAfter` of a DER-encoded X.509 certificate
pub fn not_after_from_der(der: &[u8]) -> Result<DateTime<Utc>, ProbeError> {
    let (_, cert) = parse_x509_certificate(der).map_err(|e| ProbeError::Certificate(e.to_string()))?;
    let timestamp = cert.validity().not_after.timestamp();

    DateTime::<Utc>::from_timestamp(timestamp, 0)
        .ok_or_else(|| ProbeError::Certificate(format!("expiry {} out of range", timestamp)))
}
