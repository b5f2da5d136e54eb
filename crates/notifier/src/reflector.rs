//! Observability hooks for per-recipient delivery facts.

use pushgate_common::types::{App, Notification, Provider};

/// Fire-and-forget sink for delivery events.
pub trait Reflector: Send + Sync {
    fn delivered_to_recipient(&self, provider: Provider, notification: &Notification, endpoint: &str);

    fn failed_to_recipient(
        &self,
        provider: Provider,
        notification: &Notification,
        message: &str,
        endpoint: &str,
    );

    /// The endpoint is dead and should be removed from the app's subscriptions.
    fn invalid_endpoint(&self, provider: Provider, app: &App, message: &str, endpoint: &str);
}

/// Reflector that records every event as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReflector;

impl Reflector for TracingReflector {
    fn delivered_to_recipient(&self, provider: Provider, notification: &Notification, endpoint: &str) {
        tracing::debug!(
            %provider,
            notification_id = %notification.id,
            endpoint,
            "Delivered to recipient"
        );
    }

    fn failed_to_recipient(
        &self,
        provider: Provider,
        notification: &Notification,
        message: &str,
        endpoint: &str,
    ) {
        tracing::info!(
            %provider,
            notification_id = %notification.id,
            endpoint,
            error = message,
            "Failed to deliver to recipient"
        );
    }

    fn invalid_endpoint(&self, provider: Provider, app: &App, message: &str, endpoint: &str) {
        tracing::info!(
            %provider,
            app = %app.name,
            endpoint,
            error = message,
            "Invalid endpoint"
        );
    }
}
