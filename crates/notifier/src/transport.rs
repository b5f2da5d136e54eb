//! Wire-level request/response types and the HTTP transport that sends them.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, RETRY_AFTER};
use thiserror::Error;

use pushgate_common::config::NotifierConfig;

/// A fully built push request for one endpoint.
#[derive(Debug, Clone)]
pub struct WireRequest {
    pub url: String,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

/// Status and headers of a push service response. The body is never inspected.
#[derive(Debug, Clone)]
pub struct WireResponse {
    pub status: u16,
    pub headers: HeaderMap,
}

impl WireResponse {
    pub fn new(status: u16) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
        }
    }

    /// Attach a `Retry-After` header. Invalid header values are ignored.
    pub fn with_retry_after(mut self, value: &str) -> Self {
        if let Ok(value) = HeaderValue::from_str(value) {
            self.headers.insert(RETRY_AFTER, value);
        }
        self
    }

    /// Raw `Retry-After` value, if present and valid UTF-8.
    pub fn retry_after(&self) -> Option<&str> {
        self.headers
            .get(RETRY_AFTER)
            .and_then(|value| value.to_str().ok())
    }
}

#[derive(Debug, Error)]
pub enum TransportError {
    /// DNS, socket, or timeout failure before a response arrived.
    #[error("connection failed: {0}")]
    Connection(String),

    #[error("transport error: {0}")]
    Other(String),
}

impl TransportError {
    pub fn is_connection(&self) -> bool {
        matches!(self, TransportError::Connection(_))
    }
}

/// Sends wire requests to push services.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError>;
}

/// [`Transport`] backed by a shared `reqwest` client.
#[derive(Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    /// Build the underlying client with the configured timeouts and user agent.
    pub fn from_config(config: &NotifierConfig) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .timeout(Duration::from_millis(config.request_timeout_ms))
            .connect_timeout(Duration::from_millis(config.connect_timeout_ms));
        if let Some(user_agent) = &config.user_agent {
            builder = builder.user_agent(user_agent.clone());
        }

        let client = builder.build()?;
        tracing::debug!(
            request_timeout_ms = config.request_timeout_ms,
            connect_timeout_ms = config.connect_timeout_ms,
            "HTTP push transport ready"
        );
        Ok(Self { client })
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(&self, request: WireRequest) -> Result<WireResponse, TransportError> {
        let response = self
            .client
            .post(&request.url)
            .headers(request.headers)
            .body(request.body)
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        Ok(WireResponse {
            status: response.status().as_u16(),
            headers: response.headers().clone(),
        })
    }
}

/// Only failures to establish the connection are retryable as a whole; a
/// request that timed out after connecting may already have been delivered.
fn classify_reqwest_error(err: reqwest::Error) -> TransportError {
    if err.is_connect() {
        TransportError::Connection(err.to_string())
    } else {
        TransportError::Other(err.to_string())
    }
}
