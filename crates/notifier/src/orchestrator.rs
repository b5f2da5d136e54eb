//! Delivery orchestration for one notification.
//!
//! Drives a notification through the dispatcher, then settles it:
//! 1. Every recipient succeeded → mark delivered, then report each recipient
//! 2. Some recipients failed → split the temporary ones into a new notification,
//!    report the permanent ones, mark this notification failed
//! 3. The push service rejected the request (400/413) → mark failed, no split
//! 4. Connection failure → mark the whole notification retryable after a short delay
//! 5. Anything else → mark failed
//!
//! The batch is told the notification was processed on every path.

use std::sync::Arc;

use chrono::{DateTime, TimeDelta, Utc};
use uuid::Uuid;

use pushgate_common::config::NotifierConfig;
use pushgate_common::types::{App, Notification};

use crate::batch::Batch;
use crate::dispatcher::{DispatchError, Dispatcher};
use crate::error::DeliveryError;
use crate::failures::Failures;
use crate::providers::ProviderPolicy;
use crate::reflector::Reflector;
use crate::results::Results;
use crate::splitter::{DEFAULT_RETRY_DELAY_SECS, NotificationSplitter};
use crate::store::NotificationStore;
use crate::transport::{Transport, TransportError};

/// Delay before re-offering a notification whose connection failed.
pub const TRANSPORT_RETRY_DELAY_SECS: i64 = 10;

/// Upper bound applied to configured delays.
const MAX_CONFIGURED_DELAY_SECS: u64 = i32::MAX as u64;

/// Timing knobs of the orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliverySettings {
    pub transport_retry_delay: TimeDelta,
    pub default_retry_delay: TimeDelta,
}

impl Default for DeliverySettings {
    fn default() -> Self {
        Self {
            transport_retry_delay: TimeDelta::seconds(TRANSPORT_RETRY_DELAY_SECS),
            default_retry_delay: TimeDelta::seconds(DEFAULT_RETRY_DELAY_SECS),
        }
    }
}

impl From<&NotifierConfig> for DeliverySettings {
    fn from(config: &NotifierConfig) -> Self {
        let seconds = |value: u64| TimeDelta::seconds(value.min(MAX_CONFIGURED_DELAY_SECS) as i64);
        Self {
            transport_retry_delay: seconds(config.transport_retry_delay_secs),
            default_retry_delay: seconds(config.default_retry_delay_secs),
        }
    }
}

/// Final state of one delivery attempt.
#[derive(Debug)]
pub enum DeliveryOutcome {
    /// Every recipient accepted the message.
    Delivered,
    /// Some recipients failed. `retry` is the notification created for the temporary ones.
    PartiallyFailed {
        retry: Option<Uuid>,
        error: DeliveryError,
    },
    /// The notification will not be retried.
    Failed { error: DeliveryError },
    /// The whole notification will be re-offered at `deliver_after`.
    Retryable {
        deliver_after: DateTime<Utc>,
        error: DeliveryError,
    },
}

impl DeliveryOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, DeliveryOutcome::Delivered)
    }

    pub fn error(&self) -> Option<&DeliveryError> {
        match self {
            DeliveryOutcome::Delivered => None,
            DeliveryOutcome::PartiallyFailed { error, .. }
            | DeliveryOutcome::Failed { error }
            | DeliveryOutcome::Retryable { error, .. } => Some(error),
        }
    }

    /// Collapse into a `Result`; a scheduled retry still counts as an error.
    pub fn into_result(self) -> Result<(), DeliveryError> {
        match self {
            DeliveryOutcome::Delivered => Ok(()),
            DeliveryOutcome::PartiallyFailed { error, .. }
            | DeliveryOutcome::Failed { error }
            | DeliveryOutcome::Retryable { error, .. } => Err(error),
        }
    }
}

/// Delivers notifications of one provider and settles their store status.
pub struct DeliveryOrchestrator {
    dispatcher: Dispatcher,
    store: Arc<dyn NotificationStore>,
    reflector: Arc<dyn Reflector>,
    splitter: NotificationSplitter,
    settings: DeliverySettings,
}

impl DeliveryOrchestrator {
    pub fn new(
        transport: Arc<dyn Transport>,
        policy: Arc<dyn ProviderPolicy>,
        store: Arc<dyn NotificationStore>,
        reflector: Arc<dyn Reflector>,
    ) -> Self {
        Self {
            dispatcher: Dispatcher::new(transport, policy),
            store,
            reflector,
            splitter: NotificationSplitter::default(),
            settings: DeliverySettings::default(),
        }
    }

    pub fn with_settings(mut self, settings: DeliverySettings) -> Self {
        self.splitter = NotificationSplitter::new(settings.default_retry_delay);
        self.settings = settings;
        self
    }

    /// Deliver `notification` to all its recipients and record the outcome.
    ///
    /// `batch` is signalled exactly once when this returns or unwinds.
    pub async fn deliver(
        &self,
        app: &App,
        notification: &Notification,
        batch: &Batch,
    ) -> DeliveryOutcome {
        let _completion = batch.guard();

        let mut results = Results::new(self.dispatcher.policy(), notification);
        match self.dispatcher.dispatch(app, notification, &mut results).await {
            Ok(()) => self.handle_results(app, notification, results).await,
            Err(DispatchError::Protocol { endpoint, failure }) => {
                tracing::error!(
                    notification_id = %notification.id,
                    endpoint = %endpoint,
                    status = failure.status(),
                    "Push service rejected request"
                );
                let error = DeliveryError::Protocol {
                    notification_id: notification.id,
                    status: failure.status(),
                    message: failure.message(),
                };
                self.fail(notification, error).await
            }
            Err(DispatchError::Transport(source)) if source.is_connection() => {
                self.retry_later(notification, source).await
            }
            Err(other) => {
                let error = DeliveryError::Unexpected {
                    notification_id: notification.id,
                    message: other.to_string(),
                };
                self.fail(notification, error).await
            }
        }
    }

    async fn handle_results(
        &self,
        app: &App,
        notification: &Notification,
        results: Results<'_>,
    ) -> DeliveryOutcome {
        if !results.has_failures() {
            return match self.store.mark_delivered(notification).await {
                Ok(()) => {
                    self.reflect_successes(notification, &results.successes);
                    tracing::info!(
                        notification_id = %notification.id,
                        endpoints = %notification.endpoints().join(", "),
                        "Notification delivered"
                    );
                    DeliveryOutcome::Delivered
                }
                Err(e) => {
                    let error = DeliveryError::Unexpected {
                        notification_id: notification.id,
                        message: e.to_string(),
                    };
                    self.fail(notification, error).await
                }
            };
        }

        self.reflect_successes(notification, &results.successes);
        let retry = match self.handle_failures(app, notification, &results.failures).await {
            Ok(retry) => retry,
            Err(error) => return self.fail(notification, error).await,
        };

        let error = DeliveryError::Aggregate {
            notification_id: notification.id,
            description: results.failures.description(),
        };
        self.record_failure(notification, &error).await;
        DeliveryOutcome::PartiallyFailed { retry, error }
    }

    fn reflect_successes(&self, notification: &Notification, endpoints: &[String]) {
        let provider = self.dispatcher.policy().provider();
        for endpoint in endpoints {
            self.reflector
                .delivered_to_recipient(provider, notification, endpoint);
        }
    }

    /// Split off the temporary failures and report the permanent ones.
    async fn handle_failures(
        &self,
        app: &App,
        notification: &Notification,
        failures: &Failures,
    ) -> Result<Option<Uuid>, DeliveryError> {
        let retry = self
            .splitter
            .split(self.store.as_ref(), app, notification, &failures.temporary)
            .await
            .map_err(|e| DeliveryError::Unexpected {
                notification_id: notification.id,
                message: format!("could not create retry notification: {}", e),
            })?
            .map(|new| {
                tracing::info!(
                    notification_id = %notification.id,
                    retry_notification_id = %new.id,
                    deliver_after = ?new.deliver_after,
                    "{} endpoints will be retried as notification {}",
                    failures.temporary.len(),
                    new.id
                );
                new.id
            });

        let policy = self.dispatcher.policy();
        for failure in &failures.permanent {
            self.reflector.failed_to_recipient(
                policy.provider(),
                notification,
                &failure.message,
                &failure.endpoint,
            );
            if policy.is_invalid_endpoint(failure.status) {
                self.reflector.invalid_endpoint(
                    policy.provider(),
                    app,
                    &failure.message,
                    &failure.endpoint,
                );
            }
        }

        Ok(retry)
    }

    async fn retry_later(
        &self,
        notification: &Notification,
        source: TransportError,
    ) -> DeliveryOutcome {
        let deliver_after = Utc::now() + self.settings.transport_retry_delay;
        let error = DeliveryError::Transport {
            notification_id: notification.id,
            source,
        };

        tracing::warn!(
            notification_id = %notification.id,
            deliver_after = %deliver_after,
            error = %error,
            "Connection failed, notification will be retried"
        );

        if let Err(e) = self
            .store
            .mark_retryable(notification, deliver_after, &error.to_string())
            .await
        {
            tracing::warn!(
                notification_id = %notification.id,
                error = %e,
                "Failed to mark notification retryable"
            );
        }

        DeliveryOutcome::Retryable {
            deliver_after,
            error,
        }
    }

    async fn fail(&self, notification: &Notification, error: DeliveryError) -> DeliveryOutcome {
        tracing::error!(
            notification_id = %notification.id,
            error = %error,
            "Notification delivery failed"
        );
        self.record_failure(notification, &error).await;
        DeliveryOutcome::Failed { error }
    }

    async fn record_failure(&self, notification: &Notification, error: &DeliveryError) {
        if let Err(e) = self.store.mark_failed(notification, &error.to_string()).await {
            tracing::warn!(
                notification_id = %notification.id,
                error = %e,
                "Failed to mark notification failed"
            );
        }
    }
}
