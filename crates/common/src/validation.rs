//! Producer-side checks a notification must pass before it is queued.
//!
//! The delivery core assumes these hold and does not re-check them.

use thiserror::Error;

use crate::types::Notification;

/// Maximum serialized size of a notification's data payload in bytes.
pub const MAX_PAYLOAD_BYTES: usize = 4096;

/// Maximum number of recipients in one notification.
pub const MAX_RECIPIENTS: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("notification has no recipients")]
    NoRecipients,

    #[error("too many recipients: {count} (limit {MAX_RECIPIENTS})")]
    TooManyRecipients { count: usize },

    #[error("payload data too large: {size} bytes (limit {MAX_PAYLOAD_BYTES})")]
    PayloadTooLarge { size: usize },
}

/// Validate recipient count and payload size.
pub fn validate_notification(notification: &Notification) -> Result<(), ValidationError> {
    let count = notification.recipients.len();
    if count == 0 {
        return Err(ValidationError::NoRecipients);
    }
    if count > MAX_RECIPIENTS {
        return Err(ValidationError::TooManyRecipients { count });
    }

    let size = notification
        .data
        .as_ref()
        .map(|d| d.to_string().len())
        .unwrap_or(0);
    if size > MAX_PAYLOAD_BYTES {
        return Err(ValidationError::PayloadTooLarge { size });
    }

    Ok(())
}
