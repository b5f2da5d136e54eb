//! Response classification and per-endpoint failure accounting.

use chrono::{DateTime, Utc};

use crate::providers::{ProviderPolicy, lookup};
use crate::retry_after;
use crate::transport::WireResponse;

/// A recipient-level failure recorded during one attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Failure {
    pub endpoint: String,
    pub status: u16,
    pub message: String,
    /// Set for temporary failures only
    pub retry_after: Option<DateTime<Utc>>,
}

/// A response that condemns the whole request rather than one recipient.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtocolFailure {
    /// 400: the push service could not parse the request
    Malformed,
    /// 413: the encrypted payload exceeded the service's limit
    PayloadTooLarge,
}

impl ProtocolFailure {
    pub fn from_status(status: u16) -> Option<Self> {
        match status {
            400 => Some(ProtocolFailure::Malformed),
            413 => Some(ProtocolFailure::PayloadTooLarge),
            _ => None,
        }
    }

    pub fn status(&self) -> u16 {
        match self {
            ProtocolFailure::Malformed => 400,
            ProtocolFailure::PayloadTooLarge => 413,
        }
    }

    pub fn message(&self) -> &'static str {
        match self {
            ProtocolFailure::Malformed => "request malformed, possible implementation bug",
            ProtocolFailure::PayloadTooLarge => {
                "payload too large, must be under the provider's byte limit"
            }
        }
    }
}

/// Classification of one endpoint's response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Temporary(Failure),
    Permanent(Failure),
    Protocol(ProtocolFailure),
}

/// Maps response statuses to outcomes using a provider's status tables.
pub struct Classifier<'a> {
    policy: &'a dyn ProviderPolicy,
    /// Retry generation of the notification being delivered
    retries: u32,
}

impl<'a> Classifier<'a> {
    pub fn new(policy: &'a dyn ProviderPolicy, retries: u32) -> Self {
        Self { policy, retries }
    }

    pub fn classify(&self, endpoint: &str, response: &WireResponse, now: DateTime<Utc>) -> Outcome {
        let status = response.status;
        if matches!(status, 200 | 201) {
            return Outcome::Success;
        }
        if let Some(protocol) = ProtocolFailure::from_status(status) {
            return Outcome::Protocol(protocol);
        }

        if let Some(message) = lookup(self.policy.temporary_errors(), status) {
            return Outcome::Temporary(Failure {
                endpoint: endpoint.to_string(),
                status,
                message: message.to_string(),
                retry_after: Some(retry_after::resolve(
                    response.retry_after(),
                    self.retries,
                    now,
                )),
            });
        }

        let message = lookup(self.policy.permanent_errors(), status)
            .map(str::to_string)
            .unwrap_or_else(|| format!("unknown error: {}", status));
        Outcome::Permanent(Failure {
            endpoint: endpoint.to_string(),
            status,
            message,
            retry_after: None,
        })
    }
}

/// Temporary and permanent failures of one attempt.
#[derive(Debug, Clone, Default)]
pub struct Failures {
    pub temporary: Vec<Failure>,
    pub permanent: Vec<Failure>,
    recipient_count: usize,
}

impl Failures {
    pub fn new(recipient_count: usize) -> Self {
        Self {
            temporary: Vec::new(),
            permanent: Vec::new(),
            recipient_count,
        }
    }

    pub fn add_temporary(&mut self, failure: Failure) {
        self.temporary.push(failure);
    }

    pub fn add_permanent(&mut self, failure: Failure) {
        self.permanent.push(failure);
    }

    pub fn count(&self) -> usize {
        self.temporary.len() + self.permanent.len()
    }

    pub fn any(&self) -> bool {
        self.count() > 0
    }

    pub fn all_failed(&self) -> bool {
        self.count() == self.recipient_count
    }

    /// Temporary failures first, then permanent ones.
    pub fn all(&self) -> impl Iterator<Item = &Failure> {
        self.temporary.iter().chain(self.permanent.iter())
    }

    /// Multi-line summary grouping temporary failures before permanent ones.
    ///
    /// ```text
    /// 1 recipient(s) had temporary failures and will be retried:
    /// https://push.example.com/b - too many requests
    /// 1 recipient(s) failed permanently:
    /// https://push.example.com/a - endpoint doesn't exist
    /// ```
    pub fn description(&self) -> String {
        [
            describe(&self.temporary, "had temporary failures and will be retried"),
            describe(&self.permanent, "failed permanently"),
        ]
        .into_iter()
        .flatten()
        .collect::<Vec<_>>()
        .join("\n")
    }
}

fn describe(failures: &[Failure], summary: &str) -> Option<String> {
    if failures.is_empty() {
        return None;
    }
    let mut lines = vec![format!("{} recipient(s) {}:", failures.len(), summary)];
    lines.extend(
        failures
            .iter()
            .map(|f| format!("{} - {}", f.endpoint, f.message)),
    );
    Some(lines.join("\n"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::{
        EncryptedPayload, MozillaPolicy, PayloadEncryptor, RequestError, WebpushPolicy,
    };
    use chrono::{TimeDelta, TimeZone};
    use pushgate_common::types::SubscriptionKeys;
    use std::sync::Arc;

    struct NoopEncryptor;

    impl PayloadEncryptor for NoopEncryptor {
        fn encrypt(
            &self,
            message: &[u8],
            _keys: &SubscriptionKeys,
        ) -> Result<EncryptedPayload, RequestError> {
            Ok(EncryptedPayload {
                ciphertext: message.to_vec(),
                local_public_key: String::new(),
                encryption: String::new(),
                content_encoding: String::new(),
            })
        }
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    fn failure(endpoint: &str, status: u16, message: &str) -> Failure {
        Failure {
            endpoint: endpoint.to_string(),
            status,
            message: message.to_string(),
            retry_after: None,
        }
    }

    #[test]
    fn test_success_statuses() {
        let policy = MozillaPolicy::new();
        let classifier = Classifier::new(&policy, 0);
        assert_eq!(classifier.classify("e", &WireResponse::new(200), now()), Outcome::Success);
        assert_eq!(classifier.classify("e", &WireResponse::new(201), now()), Outcome::Success);
    }

    #[test]
    fn test_protocol_statuses() {
        let policy = MozillaPolicy::new();
        let classifier = Classifier::new(&policy, 0);
        assert_eq!(
            classifier.classify("e", &WireResponse::new(400), now()),
            Outcome::Protocol(ProtocolFailure::Malformed)
        );
        assert_eq!(
            classifier.classify("e", &WireResponse::new(413), now()),
            Outcome::Protocol(ProtocolFailure::PayloadTooLarge)
        );
    }

    #[test]
    fn test_temporary_uses_retry_after_header() {
        let policy = MozillaPolicy::new();
        let classifier = Classifier::new(&policy, 5);
        let response = WireResponse::new(429).with_retry_after("120");
        match classifier.classify("e", &response, now()) {
            Outcome::Temporary(f) => {
                assert_eq!(f.message, "too many requests");
                assert_eq!(f.retry_after, Some(now() + TimeDelta::seconds(120)));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_temporary_falls_back_to_backoff() {
        let policy = MozillaPolicy::new();
        let classifier = Classifier::new(&policy, 2);
        match classifier.classify("e", &WireResponse::new(503), now()) {
            Outcome::Temporary(f) => {
                assert_eq!(f.message, "service unavailable");
                assert_eq!(f.retry_after, Some(now() + TimeDelta::seconds(8)));
            }
            other => panic!("unexpected outcome: {:?}", other),
        }
    }

    #[test]
    fn test_permanent_messages_depend_on_provider() {
        let mozilla = MozillaPolicy::new();
        let webpush = WebpushPolicy::new(Arc::new(NoopEncryptor));

        let gone = WireResponse::new(410);
        assert_eq!(
            Classifier::new(&webpush, 0).classify("e", &gone, now()),
            Outcome::Permanent(failure("e", 410, "endpoint gone"))
        );
        assert_eq!(
            Classifier::new(&mozilla, 0).classify("e", &gone, now()),
            Outcome::Permanent(failure("e", 410, "unknown error: 410"))
        );
        assert_eq!(
            Classifier::new(&mozilla, 0).classify("e", &WireResponse::new(404), now()),
            Outcome::Permanent(failure("e", 404, "endpoint doesn't exist"))
        );
    }

    #[test]
    fn test_classification_is_stable() {
        let policy = MozillaPolicy::new();
        let classifier = Classifier::new(&policy, 1);
        let response = WireResponse::new(500);
        assert_eq!(
            classifier.classify("e", &response, now()),
            classifier.classify("e", &response, now())
        );
    }

    #[test]
    fn test_failure_counts() {
        let mut failures = Failures::new(2);
        assert!(!failures.any());
        failures.add_temporary(failure("a", 429, "too many requests"));
        assert!(failures.any());
        assert!(!failures.all_failed());
        failures.add_permanent(failure("b", 404, "endpoint doesn't exist"));
        assert_eq!(failures.count(), 2);
        assert!(failures.all_failed());
        let endpoints: Vec<&str> = failures.all().map(|f| f.endpoint.as_str()).collect();
        assert_eq!(endpoints, vec!["a", "b"]);
    }

    #[test]
    fn test_description_groups_temporary_first() {
        let mut failures = Failures::new(3);
        failures.add_permanent(failure("https://a", 404, "endpoint doesn't exist"));
        failures.add_temporary(failure("https://b", 429, "too many requests"));
        failures.add_temporary(failure("https://c", 503, "service unavailable"));

        assert_eq!(
            failures.description(),
            "2 recipient(s) had temporary failures and will be retried:\n\
             https://b - too many requests\n\
             https://c - service unavailable\n\
             1 recipient(s) failed permanently:\n\
             https://a - endpoint doesn't exist"
        );
    }

    #[test]
    fn test_description_with_only_permanent() {
        let mut failures = Failures::new(1);
        failures.add_permanent(failure("https://a", 418, "unknown error: 418"));
        assert_eq!(
            failures.description(),
            "1 recipient(s) failed permanently:\nhttps://a - unknown error: 418"
        );
    }
}
