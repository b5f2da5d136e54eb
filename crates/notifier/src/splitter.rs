//! Builds replacement notifications for temporarily failed endpoints.

use chrono::{DateTime, TimeDelta, Utc};

use pushgate_common::error::AppError;
use pushgate_common::types::{App, NewNotification, Notification};

use crate::failures::Failure;
use crate::store::NotificationStore;

/// Delay used when no failure carried a retry time (10 minutes).
pub const DEFAULT_RETRY_DELAY_SECS: i64 = 600;

pub struct NotificationSplitter {
    default_delay: TimeDelta,
}

impl NotificationSplitter {
    pub fn new(default_delay: TimeDelta) -> Self {
        Self { default_delay }
    }

    /// Attributes of the replacement notification, or `None` when nothing is retryable.
    ///
    /// Recipients keep the parent's order and keys; the retry generation is
    /// bumped and `deliver_after` is the latest retry time among the failures.
    pub fn plan(
        &self,
        parent: &Notification,
        temporary: &[Failure],
        now: DateTime<Utc>,
    ) -> Option<NewNotification> {
        if temporary.is_empty() {
            return None;
        }

        let recipients = parent
            .recipients
            .iter()
            .filter(|r| temporary.iter().any(|f| f.endpoint == r.endpoint))
            .cloned()
            .collect();

        let deliver_after = temporary
            .iter()
            .filter_map(|f| f.retry_after)
            .max()
            .unwrap_or(now + self.default_delay);

        Some(NewNotification {
            app_id: parent.app_id,
            collapse_key: parent.collapse_key.clone(),
            delay_while_idle: parent.delay_while_idle,
            retries: parent.retries + 1,
            data: parent.data.clone(),
            recipients,
            deliver_after,
        })
    }

    /// Create the replacement notification through the store.
    pub async fn split(
        &self,
        store: &dyn NotificationStore,
        app: &App,
        parent: &Notification,
        temporary: &[Failure],
    ) -> Result<Option<Notification>, AppError> {
        match self.plan(parent, temporary, Utc::now()) {
            Some(new) => store.create_notification(new, app).await.map(Some),
            None => Ok(None),
        }
    }
}

impl Default for NotificationSplitter {
    fn default() -> Self {
        Self::new(TimeDelta::seconds(DEFAULT_RETRY_DELAY_SECS))
    }
}
