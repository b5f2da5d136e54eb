use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;

/// Default message lifetime in seconds (4 weeks).
pub const DEFAULT_TTL: u32 = 2_419_200;

/// Push services a notification can be routed through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Provider {
    Webpush,
    Mozilla,
}

impl std::fmt::Display for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Provider::Webpush => write!(f, "webpush"),
            Provider::Mozilla => write!(f, "mozilla"),
        }
    }
}

/// Store-level delivery status of a notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Pending,
    Delivered,
    Failed,
    Retryable,
}

impl std::fmt::Display for DeliveryStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DeliveryStatus::Pending => write!(f, "pending"),
            DeliveryStatus::Delivered => write!(f, "delivered"),
            DeliveryStatus::Failed => write!(f, "failed"),
            DeliveryStatus::Retryable => write!(f, "retryable"),
        }
    }
}

/// VAPID key pair used to sign Web Push requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VapidKeys {
    /// Contact URI (`mailto:` or `https:`) advertised to the push service
    pub subject: String,
    pub public_key: String,
    pub private_key: String,
}

impl VapidKeys {
    /// Parse the key pair out of an app's certificate field, which stores it as JSON.
    pub fn from_certificate(certificate: &str) -> Result<Self, AppError> {
        serde_json::from_str(certificate)
            .map_err(|e| AppError::Config(format!("invalid VAPID certificate: {}", e)))
    }
}

/// A push application: owns notifications and carries provider credentials.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct App {
    pub id: Uuid,
    pub name: String,
    pub provider: Provider,
    /// Provider credentials. For Web Push this holds the VAPID key pair as JSON.
    pub certificate: Option<String>,
}

impl App {
    /// VAPID keys for this app, if a certificate is configured.
    pub fn vapid(&self) -> Result<Option<VapidKeys>, AppError> {
        self.certificate
            .as_deref()
            .map(VapidKeys::from_certificate)
            .transpose()
    }
}

/// Client-side encryption material of a push subscription.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubscriptionKeys {
    pub p256dh: String,
    pub auth: String,
}

/// One addressable endpoint within a notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recipient {
    pub endpoint: String,
    pub keys: Option<SubscriptionKeys>,
}

impl Recipient {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            keys: None,
        }
    }

    pub fn with_keys(mut self, keys: SubscriptionKeys) -> Self {
        self.keys = Some(keys);
        self
    }
}

/// A notification addressed to one or more push endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: Uuid,
    pub app_id: Uuid,
    /// Optional grouping tag; newer messages with the same key replace older ones
    pub collapse_key: Option<String>,
    pub delay_while_idle: bool,
    /// Provider-opaque payload
    pub data: Option<serde_json::Value>,
    /// Explicit time-to-live in seconds; `None` means [`DEFAULT_TTL`]
    pub expiry: Option<u32>,
    /// Number of retry splits this notification descends from
    pub retries: u32,
    pub recipients: Vec<Recipient>,
    pub deliver_after: Option<DateTime<Utc>>,
    pub status: DeliveryStatus,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    /// Message lifetime in seconds handed to the push service.
    pub fn ttl(&self) -> u32 {
        self.expiry.unwrap_or(DEFAULT_TTL)
    }

    pub fn endpoints(&self) -> Vec<&str> {
        self.recipients.iter().map(|r| r.endpoint.as_str()).collect()
    }

    /// Human-readable message built from the `title` and `message` data fields.
    ///
    /// Blank fields are skipped; returns `None` when there is no data at all.
    pub fn message(&self) -> Option<String> {
        let data = self.data.as_ref()?;
        let parts: Vec<&str> = ["title", "message"]
            .iter()
            .filter_map(|key| data.get(*key).and_then(|v| v.as_str()))
            .filter(|s| !s.trim().is_empty())
            .collect();
        Some(parts.join("\n"))
    }
}

/// Attributes for a notification to be created by the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewNotification {
    pub app_id: Uuid,
    pub collapse_key: Option<String>,
    pub delay_while_idle: bool,
    pub retries: u32,
    pub data: Option<serde_json::Value>,
    pub recipients: Vec<Recipient>,
    pub deliver_after: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_notification(data: Option<serde_json::Value>) -> Notification {
        Notification {
            id: Uuid::new_v4(),
            app_id: Uuid::new_v4(),
            collapse_key: None,
            delay_while_idle: false,
            data,
            expiry: None,
            retries: 0,
            recipients: vec![
                Recipient::new("https://push.example.com/a"),
                Recipient::new("https://push.example.com/b"),
            ],
            deliver_after: None,
            status: DeliveryStatus::Pending,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_ttl_defaults_to_four_weeks() {
        let mut n = make_notification(None);
        assert_eq!(n.ttl(), 2_419_200);
        n.expiry = Some(60);
        assert_eq!(n.ttl(), 60);
    }

    #[test]
    fn test_message_joins_title_and_body() {
        let n = make_notification(Some(serde_json::json!({
            "title": "Hello",
            "message": "World"
        })));
        assert_eq!(n.message().as_deref(), Some("Hello\nWorld"));
    }

    #[test]
    fn test_message_skips_blank_fields() {
        let n = make_notification(Some(serde_json::json!({
            "title": "  ",
            "message": "Only body"
        })));
        assert_eq!(n.message().as_deref(), Some("Only body"));
        assert_eq!(make_notification(None).message(), None);
    }

    #[test]
    fn test_endpoints_keep_recipient_order() {
        let n = make_notification(None);
        assert_eq!(
            n.endpoints(),
            vec!["https://push.example.com/a", "https://push.example.com/b"]
        );
    }

    #[test]
    fn test_vapid_from_certificate() {
        let app = App {
            id: Uuid::new_v4(),
            name: "web".to_string(),
            provider: Provider::Webpush,
            certificate: Some(
                r#"{"subject":"mailto:ops@example.com","public_key":"pub","private_key":"priv"}"#
                    .to_string(),
            ),
        };
        let vapid = app.vapid().unwrap().unwrap();
        assert_eq!(vapid.subject, "mailto:ops@example.com");
        assert_eq!(vapid.public_key, "pub");
    }

    #[test]
    fn test_vapid_rejects_malformed_certificate() {
        let app = App {
            id: Uuid::new_v4(),
            name: "web".to_string(),
            provider: Provider::Webpush,
            certificate: Some("not json".to_string()),
        };
        assert!(matches!(app.vapid(), Err(AppError::Config(_))));
    }
}
