//! Per-provider delivery policy.
//!
//! The delivery engine is written once; each push service only supplies how to
//! build a request for one recipient and which response statuses are
//! temporary or permanent.

pub mod mozilla;
pub mod webpush;

use reqwest::header::{
    CONTENT_ENCODING, CONTENT_LENGTH, CONTENT_TYPE, HeaderMap, HeaderName, HeaderValue,
};
use thiserror::Error;

use pushgate_common::types::{App, Notification, Provider, Recipient, SubscriptionKeys, VapidKeys};

use crate::transport::WireRequest;

pub use mozilla::MozillaPolicy;
pub use webpush::WebpushPolicy;

/// Statuses that are worth retrying, shared by every provider.
pub const TEMPORARY_ERRORS: &[(u16, &str)] = &[
    (429, "too many requests"),
    (500, "internal server error"),
    (503, "service unavailable"),
];

static TTL: HeaderName = HeaderName::from_static("ttl");
static ENCRYPTION: HeaderName = HeaderName::from_static("encryption");
static ENCRYPTION_KEY: HeaderName = HeaderName::from_static("encryption-key");

#[derive(Debug, Error)]
pub enum RequestError {
    #[error("invalid header value for {name}: {reason}")]
    InvalidHeader { name: &'static str, reason: String },

    #[error("recipient {0} has no encryption keys")]
    MissingKeys(String),

    #[error("payload encryption failed: {0}")]
    Encryption(String),

    #[error("request signing failed: {0}")]
    Signing(String),

    #[error("app credentials unusable: {0}")]
    Credentials(String),
}

/// Ciphertext and encryption parameters produced for one subscription.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedPayload {
    pub ciphertext: Vec<u8>,
    /// Sender's ephemeral public key, sent as `Encryption-Key`
    pub local_public_key: String,
    /// Salt and record-size parameters, sent as `Encryption`
    pub encryption: String,
    /// Content coding, sent as `Content-Encoding`
    pub content_encoding: String,
}

/// Encrypts a message for one subscription's keys.
pub trait PayloadEncryptor: Send + Sync {
    fn encrypt(
        &self,
        message: &[u8],
        keys: &SubscriptionKeys,
    ) -> Result<EncryptedPayload, RequestError>;
}

/// Produces the VAPID authorization headers for a Web Push request.
pub trait VapidSigner: Send + Sync {
    fn sign(&self, endpoint: &str, vapid: &VapidKeys) -> Result<HeaderMap, RequestError>;
}

/// What a push service contributes to the generic delivery engine.
pub trait ProviderPolicy: Send + Sync {
    fn provider(&self) -> Provider;

    /// Build the wire request delivering `app`'s `notification` to `recipient`.
    fn build_request(
        &self,
        app: &App,
        notification: &Notification,
        recipient: &Recipient,
    ) -> Result<WireRequest, RequestError>;

    /// Statuses meaning the endpoint is gone for good, with their messages.
    fn permanent_errors(&self) -> &'static [(u16, &'static str)];

    fn temporary_errors(&self) -> &'static [(u16, &'static str)] {
        TEMPORARY_ERRORS
    }

    /// Whether a permanent failure with this status should be reported as an invalid endpoint.
    fn is_invalid_endpoint(&self, status: u16) -> bool {
        self.permanent_errors().iter().any(|(code, _)| *code == status)
    }
}

/// Build a `POST <endpoint>` carrying `TTL` and, when present, an encrypted body.
pub fn build_post(
    endpoint: &str,
    ttl: u32,
    payload: Option<EncryptedPayload>,
) -> Result<WireRequest, RequestError> {
    let mut headers = HeaderMap::new();
    headers.insert(TTL.clone(), HeaderValue::from(ttl));

    let body = match payload {
        Some(payload) => {
            headers.insert(
                CONTENT_TYPE,
                HeaderValue::from_static("application/octet-stream"),
            );
            headers.insert(CONTENT_LENGTH, HeaderValue::from(payload.ciphertext.len()));
            headers.insert(
                ENCRYPTION_KEY.clone(),
                header_value("Encryption-Key", &payload.local_public_key)?,
            );
            headers.insert(
                ENCRYPTION.clone(),
                header_value("Encryption", &payload.encryption)?,
            );
            headers.insert(
                CONTENT_ENCODING,
                header_value("Content-Encoding", &payload.content_encoding)?,
            );
            payload.ciphertext
        }
        None => {
            headers.insert(CONTENT_LENGTH, HeaderValue::from(0u32));
            Vec::new()
        }
    };

    Ok(WireRequest {
        url: endpoint.to_string(),
        headers,
        body,
    })
}

fn header_value(name: &'static str, value: &str) -> Result<HeaderValue, RequestError> {
    HeaderValue::from_str(value).map_err(|e| RequestError::InvalidHeader {
        name,
        reason: e.to_string(),
    })
}

/// Message text for a status, or `None` if the table doesn't list it.
pub(crate) fn lookup(table: &'static [(u16, &'static str)], status: u16) -> Option<&'static str> {
    table
        .iter()
        .find(|(code, _)| *code == status)
        .map(|(_, message)| *message)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_post_without_payload() {
        let request = build_post("https://push.example.com/abc", 60, None).unwrap();
        assert_eq!(request.url, "https://push.example.com/abc");
        assert_eq!(request.headers["ttl"], "60");
        assert_eq!(request.headers[CONTENT_LENGTH], "0");
        assert!(request.headers.get(CONTENT_TYPE).is_none());
        assert!(request.body.is_empty());
    }

    #[test]
    fn test_post_with_payload() {
        let payload = EncryptedPayload {
            ciphertext: vec![1, 2, 3, 4],
            local_public_key: "dh=BPublic".to_string(),
            encryption: "salt=abc".to_string(),
            content_encoding: "aesgcm".to_string(),
        };
        let request = build_post("https://push.example.com/abc", 2_419_200, Some(payload)).unwrap();
        assert_eq!(request.headers["ttl"], "2419200");
        assert_eq!(request.headers[CONTENT_TYPE], "application/octet-stream");
        assert_eq!(request.headers[CONTENT_LENGTH], "4");
        assert_eq!(request.headers["encryption-key"], "dh=BPublic");
        assert_eq!(request.headers["encryption"], "salt=abc");
        assert_eq!(request.headers[CONTENT_ENCODING], "aesgcm");
        assert_eq!(request.body, vec![1, 2, 3, 4]);
    }

    #[test]
    fn test_invalid_header_value_is_rejected() {
        let payload = EncryptedPayload {
            ciphertext: vec![],
            local_public_key: "bad\nvalue".to_string(),
            encryption: "salt=abc".to_string(),
            content_encoding: "aesgcm".to_string(),
        };
        assert!(matches!(
            build_post("https://push.example.com/abc", 60, Some(payload)),
            Err(RequestError::InvalidHeader { name: "Encryption-Key", .. })
        ));
    }

    #[test]
    fn test_lookup() {
        assert_eq!(lookup(TEMPORARY_ERRORS, 429), Some("too many requests"));
        assert_eq!(lookup(TEMPORARY_ERRORS, 404), None);
    }
}
