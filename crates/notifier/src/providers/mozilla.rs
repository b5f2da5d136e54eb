//! Mozilla push service (autopush).

use std::sync::Arc;

use pushgate_common::types::{App, Notification, Provider, Recipient};

use super::{PayloadEncryptor, ProviderPolicy, RequestError, build_post};
use crate::transport::WireRequest;

const PERMANENT_ERRORS: &[(u16, &str)] = &[(404, "endpoint doesn't exist")];

/// Delivery policy for Mozilla push endpoints.
///
/// Without an encryptor every request is a payload-less tickle.
#[derive(Default)]
pub struct MozillaPolicy {
    encryptor: Option<Arc<dyn PayloadEncryptor>>,
}

impl MozillaPolicy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encryptor(mut self, encryptor: Arc<dyn PayloadEncryptor>) -> Self {
        self.encryptor = Some(encryptor);
        self
    }
}

impl ProviderPolicy for MozillaPolicy {
    fn provider(&self) -> Provider {
        Provider::Mozilla
    }

    fn build_request(
        &self,
        _app: &App,
        notification: &Notification,
        recipient: &Recipient,
    ) -> Result<WireRequest, RequestError> {
        let payload = match (&self.encryptor, &recipient.keys, &notification.data) {
            (Some(encryptor), Some(keys), Some(data)) => {
                Some(encryptor.encrypt(data.to_string().as_bytes(), keys)?)
            }
            _ => None,
        };

        build_post(&recipient.endpoint, notification.ttl(), payload)
    }

    fn permanent_errors(&self) -> &'static [(u16, &'static str)] {
        PERMANENT_ERRORS
    }
}
