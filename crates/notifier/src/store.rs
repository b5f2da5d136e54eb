use async_trait::async_trait;
use chrono::{DateTime, Utc};

use pushgate_common::error::AppError;
use pushgate_common::types::{App, NewNotification, Notification};

/// Persistent notification store consumed by the delivery core.
///
/// Each delivery attempt ends in exactly one of `mark_delivered`,
/// `mark_failed`, or `mark_retryable`.
#[async_trait]
pub trait NotificationStore: Send + Sync {
    /// Create and queue a new notification; the store assigns its id.
    async fn create_notification(
        &self,
        new: NewNotification,
        app: &App,
    ) -> Result<Notification, AppError>;

    async fn mark_delivered(&self, notification: &Notification) -> Result<(), AppError>;

    async fn mark_failed(&self, notification: &Notification, error: &str) -> Result<(), AppError>;

    /// Re-offer the whole notification no earlier than `deliver_after`.
    async fn mark_retryable(
        &self,
        notification: &Notification,
        deliver_after: DateTime<Utc>,
        error: &str,
    ) -> Result<(), AppError>;
}
