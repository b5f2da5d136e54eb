//! Accumulated outcomes of one delivery attempt.

use chrono::{DateTime, Utc};

use pushgate_common::types::Notification;

use crate::failures::{Classifier, Failures, Outcome, ProtocolFailure};
use crate::providers::ProviderPolicy;
use crate::transport::WireResponse;

/// Successes and failures of one notification attempt.
///
/// Owned by a single delivery and dropped when it completes.
pub struct Results<'a> {
    classifier: Classifier<'a>,
    pub successes: Vec<String>,
    pub failures: Failures,
}

impl<'a> Results<'a> {
    pub fn new(policy: &'a dyn ProviderPolicy, notification: &Notification) -> Self {
        Self {
            classifier: Classifier::new(policy, notification.retries),
            successes: Vec::new(),
            failures: Failures::new(notification.recipients.len()),
        }
    }

    /// Classify a response and record it.
    ///
    /// Returns `Err` for statuses that invalidate the whole request; nothing is
    /// recorded in that case and the caller must stop dispatching.
    pub fn handle_response(
        &mut self,
        endpoint: &str,
        response: &WireResponse,
        now: DateTime<Utc>,
    ) -> Result<(), ProtocolFailure> {
        match self.classifier.classify(endpoint, response, now) {
            Outcome::Success => self.successes.push(endpoint.to_string()),
            Outcome::Temporary(failure) => self.failures.add_temporary(failure),
            Outcome::Permanent(failure) => self.failures.add_permanent(failure),
            Outcome::Protocol(protocol) => return Err(protocol),
        }
        Ok(())
    }

    pub fn has_failures(&self) -> bool {
        self.failures.any()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::MozillaPolicy;
    use pushgate_common::types::{DeliveryStatus, Recipient};
    use uuid::Uuid;

    fn make_notification(endpoints: &[&str]) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            collapse_key: None,
            delay_while_idle: false,
            data: None,
            expiry: None,
            retries: 0,
            recipients: endpoints.iter().map(|e| Recipient::new(*e)).collect(),
            deliver_after: None,
            status: DeliveryStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_records_each_category() {
        let policy = MozillaPolicy::new();
        let notification = make_notification(&["a", "b", "c"]);
        let mut results = Results::new(&policy, &notification);
        let now = Utc::now();

        results.handle_response("a", &WireResponse::new(201), now).unwrap();
        results.handle_response("b", &WireResponse::new(404), now).unwrap();
        results.handle_response("c", &WireResponse::new(429), now).unwrap();

        assert_eq!(results.successes, vec!["a".to_string()]);
        assert_eq!(results.failures.permanent.len(), 1);
        assert_eq!(results.failures.temporary.len(), 1);
        assert!(results.has_failures());
        assert!(!results.failures.all_failed());
    }

    #[test]
    fn test_protocol_failure_is_not_recorded() {
        let policy = MozillaPolicy::new();
        let notification = make_notification(&["a", "b"]);
        let mut results = Results::new(&policy, &notification);

        let err = results
            .handle_response("a", &WireResponse::new(413), Utc::now())
            .unwrap_err();
        assert_eq!(err, ProtocolFailure::PayloadTooLarge);
        assert!(results.successes.is_empty());
        assert!(!results.has_failures());
    }
}
