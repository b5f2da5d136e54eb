//! Web Push (RFC 8030) with VAPID-signed requests.

use std::sync::Arc;

use pushgate_common::types::{App, Notification, Provider, Recipient};

use super::{PayloadEncryptor, ProviderPolicy, RequestError, VapidSigner, build_post};
use crate::transport::WireRequest;

const PERMANENT_ERRORS: &[(u16, &str)] = &[
    (404, "endpoint doesn't exist"),
    (410, "endpoint gone"),
];

/// Delivery policy for Web Push subscriptions.
///
/// VAPID keys are read from the delivering app's certificate on every request,
/// so one policy serves any number of apps.
pub struct WebpushPolicy {
    encryptor: Arc<dyn PayloadEncryptor>,
    signer: Option<Arc<dyn VapidSigner>>,
}

impl WebpushPolicy {
    pub fn new(encryptor: Arc<dyn PayloadEncryptor>) -> Self {
        Self {
            encryptor,
            signer: None,
        }
    }

    pub fn with_signer(mut self, signer: Arc<dyn VapidSigner>) -> Self {
        self.signer = Some(signer);
        self
    }
}

impl ProviderPolicy for WebpushPolicy {
    fn provider(&self) -> Provider {
        Provider::Webpush
    }

    fn build_request(
        &self,
        app: &App,
        notification: &Notification,
        recipient: &Recipient,
    ) -> Result<WireRequest, RequestError> {
        let payload = match notification.message().filter(|m| !m.is_empty()) {
            Some(message) => {
                let keys = recipient
                    .keys
                    .as_ref()
                    .ok_or_else(|| RequestError::MissingKeys(recipient.endpoint.clone()))?;
                Some(self.encryptor.encrypt(message.as_bytes(), keys)?)
            }
            None => None,
        };

        let mut request = build_post(&recipient.endpoint, notification.ttl(), payload)?;

        if let Some(signer) = &self.signer {
            let vapid = app
                .vapid()
                .map_err(|e| RequestError::Credentials(e.to_string()))?;
            if let Some(vapid) = vapid {
                let auth = signer.sign(&recipient.endpoint, &vapid)?;
                request.headers.extend(auth);
            }
        }

        Ok(request)
    }

    fn permanent_errors(&self) -> &'static [(u16, &'static str)] {
        PERMANENT_ERRORS
    }
}
