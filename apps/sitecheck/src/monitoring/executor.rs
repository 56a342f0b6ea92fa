use std::sync::Arc;

use chrono::{DateTime, Utc};
use regex::Regex;
use tracing::debug;

use super::checker::{ProbeResponse, Prober};
use super::types::{CheckResult, DEFAULT_MIN_CERT_DAYS, Failure, Target};
use crate::error::ProbeError;

/// Check executor - turns one probe of a target into a `CheckResult`
pub struct CheckExecutor {
    prober: Arc<dyn Prober>,
    default_min_cert_days: i64,
}

impl CheckExecutor {
    pub fn new(prober: Arc<dyn Prober>) -> Self {
        Self { prober, default_min_cert_days: DEFAULT_MIN_CERT_DAYS }
    }

    /// Threshold used by targets without their own `min_cert_days`
    pub fn with_default_min_cert_days(mut self, days: i64) -> Self {
        self.default_min_cert_days = days;
        self
    }

    /// Execute a check against the current time
    pub async fn execute_check(&self, target: &Target) -> CheckResult {
        self.execute_check_at(target, Utc::now()).await
    }

    /// Execute a check, computing certificate lifetimes relative to `now`.
    ///
    /// Never fails: every problem is recorded as a `Failure` on the result.
    pub async fn execute_check_at(&self, target: &Target, now: DateTime<Utc>) -> CheckResult {
        let mut result = CheckResult::new(target.url.clone(), now);
        let threshold = target.min_cert_days.unwrap_or(self.default_min_cert_days);

        let response = match self.prober.fetch(target).await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %target.url, error = %e, "Probe failed");
                if target.is_https() && matches!(e, ProbeError::Tls(_)) {
                    if let Some(expired) = self.expired_certificate(target, now).await {
                        return expired;
                    }
                }
                return result.with_failure(Failure::Unreachable { reason: e.to_string() });
            }
        };

        result.status_code = Some(response.status_code);
        if let Some(failure) = evaluate_response(target, &response) {
            result = result.with_failure(failure);
        }

        if target.is_https() {
            result = match self.prober.certificate_expiry(target).await {
                Ok(expiry) => {
                    let result = result.with_certificate(expiry);
                    match evaluate_expiry(expiry, now, threshold) {
                        Some(failure) => result.with_failure(failure),
                        None => result,
                    }
                }
                Err(e) => result.with_failure(Failure::CertificateUnavailable { reason: e.to_string() }),
            };
        }

        result
    }

    /// After a rejected handshake, report an expired certificate as such.
    ///
    /// `None` when the certificate is still valid or cannot be read, leaving the
    /// handshake error as the failure.
    async fn expired_certificate(&self, target: &Target, now: DateTime<Utc>) -> Option<CheckResult> {
        let expiry = self.prober.certificate_expiry(target).await.ok()?;
        if expiry > now {
            return None;
        }

        let days_ago = (now - expiry).num_days();
        Some(
            CheckResult::new(target.url.clone(), now)
                .with_certificate(expiry)
                .with_failure(Failure::CertificateExpired { days_ago }),
        )
    }
}

/// Compare a response against the target's expectations
fn evaluate_response(target: &Target, response: &ProbeResponse) -> Option<Failure> {
    if response.status_code != target.expected_status {
        return Some(Failure::StatusMismatch {
            expected: target.expected_status,
            received: response.status_code,
        });
    }

    match response.status_code {
        301 | 302 | 303 | 307 | 308 => {
            let expected = target.redirect.as_ref()?;
            if response.location.as_ref() != Some(expected) {
                return Some(Failure::RedirectMismatch {
                    expected: expected.clone(),
                    received: response.location.clone(),
                });
            }
            None
        }
        200 => {
            let pattern = target.contents.as_ref()?;
            let body = response.body.as_deref().unwrap_or_default();
            // Patterns are validated when the sites file is loaded
            let matched = Regex::new(pattern).map(|re| re.is_match(body)).unwrap_or(false);
            (!matched).then(|| Failure::ContentMismatch { pattern: pattern.clone() })
        }
        _ => None,
    }
}

/// An expired certificate, or one with fewer than `min_days` whole days left
fn evaluate_expiry(expiry: DateTime<Utc>, now: DateTime<Utc>, min_days: i64) -> Option<Failure> {
    if expiry <= now {
        return Some(Failure::CertificateExpired { days_ago: (now - expiry).num_days() });
    }

    let days_left = (expiry - now).num_days();
    (days_left < min_days).then_some(Failure::CertificateExpiringSoon { days_left })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Answers every request the same way and counts certificate lookups
    struct StubProber {
        response: Result<ProbeResponse, String>,
        handshake_rejected: bool,
        expiry: Result<DateTime<Utc>, String>,
        cert_calls: AtomicUsize,
    }

    impl StubProber {
        fn answering(status_code: u16) -> Self {
            Self {
                response: Ok(ProbeResponse { status_code, ..Default::default() }),
                handshake_rejected: false,
                expiry: Ok(Utc::now() + Duration::days(90)),
                cert_calls: AtomicUsize::new(0),
            }
        }

        fn response(mut self, response: ProbeResponse) -> Self {
            self.response = Ok(response);
            self
        }

        fn refusing() -> Self {
            Self { response: Err("connection refused".into()), ..Self::answering(200) }
        }

        fn rejecting_handshake() -> Self {
            Self {
                response: Err("certificate has expired".into()),
                handshake_rejected: true,
                ..Self::answering(200)
            }
        }

        fn expiring_at(mut self, expiry: DateTime<Utc>) -> Self {
            self.expiry = Ok(expiry);
            self
        }
    }

    #[async_trait::async_trait]
    impl Prober for StubProber {
        async fn fetch(&self, _target: &Target) -> Result<ProbeResponse, ProbeError> {
            self.response.clone().map_err(|reason| {
                if self.handshake_rejected { ProbeError::Tls(reason) } else { ProbeError::Request(reason) }
            })
        }

        async fn certificate_expiry(&self, _target: &Target) -> Result<DateTime<Utc>, ProbeError> {
            self.cert_calls.fetch_add(1, Ordering::SeqCst);
            self.expiry.clone().map_err(ProbeError::Tls)
        }
    }

    #[tokio::test]
    async fn test_matching_status_succeeds() {
        let executor = CheckExecutor::new(Arc::new(StubProber::answering(200)));
        let result = executor.execute_check(&Target::new("http://example.com/")).await;

        assert!(result.is_success());
        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.cert_expiry, None);
    }

    #[tokio::test]
    async fn test_status_mismatch_fails() {
        let executor = CheckExecutor::new(Arc::new(StubProber::answering(503)));
        let result = executor.execute_check(&Target::new("http://example.com/")).await;

        assert_eq!(result.failures, vec![Failure::StatusMismatch { expected: 200, received: 503 }]);
        assert_eq!(result.error_message(), "expected response code 200 received 503");
    }

    #[tokio::test]
    async fn test_unreachable_target_skips_certificate() {
        let prober = Arc::new(StubProber::refusing());
        let executor = CheckExecutor::new(prober.clone());
        let result = executor.execute_check(&Target::new("https://example.com/")).await;

        assert_eq!(result.status_code, None);
        assert_eq!(result.error_count(), 1);
        assert!(result.error_message().contains("connection refused"));
        assert_eq!(prober.cert_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_certificate_expiring_soon_fails_despite_status() {
        let now = Utc::now();
        let prober = StubProber::answering(200).expiring_at(now + Duration::days(3) + Duration::hours(1));
        let executor = CheckExecutor::new(Arc::new(prober));

        let target = Target::new("https://example.com/").with_min_cert_days(14);
        let result = executor.execute_check_at(&target, now).await;

        assert_eq!(result.status_code, Some(200));
        assert_eq!(result.days_until_expiry, Some(3));
        assert_eq!(result.failures, vec![Failure::CertificateExpiringSoon { days_left: 3 }]);
        assert_eq!(result.error_message(), "SSL certificate expires in 3 days");
    }

    #[tokio::test]
    async fn test_certificate_threshold_falls_back_to_default() {
        let now = Utc::now();
        let prober = StubProber::answering(200).expiring_at(now + Duration::days(20));
        let executor = CheckExecutor::new(Arc::new(prober)).with_default_min_cert_days(30);

        let result = executor.execute_check_at(&Target::new("https://example.com/"), now).await;
        assert_eq!(result.failures, vec![Failure::CertificateExpiringSoon { days_left: 20 }]);

        let relaxed = Target::new("https://example.com/").with_min_cert_days(7);
        assert!(executor.execute_check_at(&relaxed, now).await.is_success());
    }

    #[tokio::test]
    async fn test_expired_certificate_fails() {
        let now = Utc::now();
        let prober = StubProber::answering(200).expiring_at(now - Duration::days(2));
        let executor = CheckExecutor::new(Arc::new(prober));

        let result = executor.execute_check_at(&Target::new("https://example.com/"), now).await;
        assert_eq!(result.failures, vec![Failure::CertificateExpired { days_ago: 2 }]);
    }

    #[tokio::test]
    async fn test_certificate_lookup_failure_is_recorded() {
        let prober = StubProber { expiry: Err("handshake reset".into()), ..StubProber::answering(200) };
        let executor = CheckExecutor::new(Arc::new(prober));

        let result = executor.execute_check(&Target::new("https://example.com/")).await;
        assert!(matches!(result.failures.as_slice(), [Failure::CertificateUnavailable { .. }]));
    }

    #[tokio::test]
    async fn test_redirect_location_checked() {
        let prober = StubProber::answering(301).response(ProbeResponse {
            status_code: 301,
            location: Some("https://www.example.com/".into()),
            body: None,
        });
        let executor = CheckExecutor::new(Arc::new(prober));

        let good = Target::new("http://example.com/").with_status(301).with_redirect("https://www.example.com/");
        assert!(executor.execute_check(&good).await.is_success());

        let bad = Target::new("http://example.com/").with_status(301).with_redirect("https://example.com/");
        let result = executor.execute_check(&bad).await;
        assert_eq!(result.error_message(), "expected redirect https://example.com/ received https://www.example.com/");
    }

    #[tokio::test]
    async fn test_contents_checked_on_ok_response() {
        let prober = StubProber::answering(200).response(ProbeResponse {
            status_code: 200,
            location: None,
            body: Some("<h1>Official home of the Python Programming Language</h1>".into()),
        });
        let executor = CheckExecutor::new(Arc::new(prober));

        let good = Target::new("http://python.example/").with_contents("home of the Python");
        assert!(executor.execute_check(&good).await.is_success());

        let bad = Target::new("http://python.example/").with_contents("Rust");
        let result = executor.execute_check(&bad).await;
        assert_eq!(result.failures, vec![Failure::ContentMismatch { pattern: "Rust".into() }]);
    }

    #[tokio::test]
    async fn test_threshold_is_strictly_less_than() {
        let now = Utc::now();
        let prober = StubProber::answering(200).expiring_at(now + Duration::days(14) + Duration::hours(5));
        let executor = CheckExecutor::new(Arc::new(prober));

        let at_threshold = Target::new("https://example.com/").with_min_cert_days(14);
        let result = executor.execute_check_at(&at_threshold, now).await;
        assert_eq!(result.days_until_expiry, Some(14));
        assert!(result.is_success());

        let one_over = Target::new("https://example.com/").with_min_cert_days(15);
        let result = executor.execute_check_at(&one_over, now).await;
        assert_eq!(result.failures, vec![Failure::CertificateExpiringSoon { days_left: 14 }]);
    }

    #[tokio::test]
    async fn test_zero_threshold_only_fails_expired() {
        let now = Utc::now();
        let target = Target::new("https://example.com/").with_min_cert_days(0);

        let last_day = StubProber::answering(200).expiring_at(now + Duration::hours(3));
        let result = CheckExecutor::new(Arc::new(last_day)).execute_check_at(&target, now).await;
        assert_eq!(result.days_until_expiry, Some(0));
        assert!(result.is_success());

        let expired = StubProber::answering(200).expiring_at(now - Duration::hours(3));
        let result = CheckExecutor::new(Arc::new(expired)).execute_check_at(&target, now).await;
        assert_eq!(result.failures, vec![Failure::CertificateExpired { days_ago: 0 }]);
    }

    #[tokio::test]
    async fn test_rejected_handshake_reports_expired_certificate() {
        let now = Utc::now();
        let prober = Arc::new(StubProber::rejecting_handshake().expiring_at(now - Duration::days(3)));
        let executor = CheckExecutor::new(prober.clone());

        let result = executor.execute_check_at(&Target::new("https://expired.example/"), now).await;

        assert_eq!(result.status_code, None);
        assert_eq!(result.failures, vec![Failure::CertificateExpired { days_ago: 3 }]);
        assert_eq!(result.error_message(), "SSL certificate expired 3 days ago");
        assert_eq!(prober.cert_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_rejected_handshake_with_valid_certificate_is_unreachable() {
        let now = Utc::now();
        let prober = StubProber::rejecting_handshake().expiring_at(now + Duration::days(90));
        let executor = CheckExecutor::new(Arc::new(prober));

        let result = executor.execute_check_at(&Target::new("https://self-signed.example/"), now).await;

        assert_eq!(result.error_count(), 1);
        assert!(matches!(result.failures.as_slice(), [Failure::Unreachable { .. }]));
    }
}
