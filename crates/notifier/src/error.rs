use thiserror::Error;
use uuid::Uuid;

use crate::transport::TransportError;

/// Why a delivery attempt did not fully succeed.
#[derive(Debug, Error)]
pub enum DeliveryError {
    /// The push service rejected the request itself (400 or 413).
    #[error("Notification {notification_id} rejected with status {status}: {message}")]
    Protocol {
        notification_id: Uuid,
        status: u16,
        message: &'static str,
    },

    /// At least one recipient failed; `description` lists them.
    #[error("Notification {notification_id} was not delivered to every recipient:\n{description}")]
    Aggregate {
        notification_id: Uuid,
        description: String,
    },

    #[error("Notification {notification_id} could not reach the push service: {source}")]
    Transport {
        notification_id: Uuid,
        #[source]
        source: TransportError,
    },

    #[error("Notification {notification_id} failed unexpectedly: {message}")]
    Unexpected {
        notification_id: Uuid,
        message: String,
    },
}

impl DeliveryError {
    pub fn notification_id(&self) -> Uuid {
        match self {
            DeliveryError::Protocol { notification_id, .. }
            | DeliveryError::Aggregate { notification_id, .. }
            | DeliveryError::Transport { notification_id, .. }
            | DeliveryError::Unexpected { notification_id, .. } => *notification_id,
        }
    }

    /// HTTP status behind the error, for protocol failures.
    pub fn status(&self) -> Option<u16> {
        match self {
            DeliveryError::Protocol { status, .. } => Some(*status),
            _ => None,
        }
    }
}
