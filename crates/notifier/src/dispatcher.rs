//! Sequential per-endpoint dispatch of one notification.

use std::sync::Arc;

use chrono::Utc;
use thiserror::Error;

use pushgate_common::types::{App, Notification};

use crate::failures::ProtocolFailure;
use crate::providers::{ProviderPolicy, RequestError};
use crate::results::Results;
use crate::transport::{Transport, TransportError};

/// Reasons dispatch stops before every recipient was tried.
#[derive(Debug, Error)]
pub enum DispatchError {
    #[error("{endpoint} answered {}: {}", .failure.status(), .failure.message())]
    Protocol {
        endpoint: String,
        failure: ProtocolFailure,
    },

    #[error(transparent)]
    Transport(#[from] TransportError),

    #[error(transparent)]
    Request(#[from] RequestError),
}

/// Sends one request per recipient, in recipient order, feeding each response into [`Results`].
pub struct Dispatcher {
    transport: Arc<dyn Transport>,
    policy: Arc<dyn ProviderPolicy>,
}

impl Dispatcher {
    pub fn new(transport: Arc<dyn Transport>, policy: Arc<dyn ProviderPolicy>) -> Self {
        Self { transport, policy }
    }

    pub fn policy(&self) -> &dyn ProviderPolicy {
        self.policy.as_ref()
    }

    /// Dispatch to every recipient. The first protocol, transport, or request
    /// error aborts the remaining recipients.
    pub async fn dispatch(
        &self,
        app: &App,
        notification: &Notification,
        results: &mut Results<'_>,
    ) -> Result<(), DispatchError> {
        for recipient in &notification.recipients {
            let request = self.policy.build_request(app, notification, recipient)?;
            let response = self.transport.send(request).await?;

            tracing::debug!(
                notification_id = %notification.id,
                endpoint = %recipient.endpoint,
                status = response.status,
                "Push service responded"
            );

            results
                .handle_response(&recipient.endpoint, &response, Utc::now())
                .map_err(|failure| DispatchError::Protocol {
                    endpoint: recipient.endpoint.clone(),
                    failure,
                })?;
        }
        Ok(())
    }
}
