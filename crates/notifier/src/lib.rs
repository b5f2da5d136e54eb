//! Push notification delivery core.
//!
//! Sends one request per recipient endpoint, classifies every response, and
//! settles the notification: delivered, split into a retry notification for
//! temporarily failing endpoints, retried whole after a connection failure,
//! or failed. Provider differences live in [`providers::ProviderPolicy`];
//! the store, transport and observability sinks are injected capabilities.

pub mod batch;
pub mod dispatcher;
pub mod error;
pub mod failures;
pub mod orchestrator;
pub mod providers;
pub mod reflector;
pub mod results;
pub mod retry_after;
pub mod splitter;
pub mod store;
pub mod transport;

pub use batch::Batch;
pub use error::DeliveryError;
pub use orchestrator::{DeliveryOrchestrator, DeliveryOutcome, DeliverySettings};
pub use reflector::{Reflector, TracingReflector};
pub use store::NotificationStore;
pub use transport::{HttpTransport, Transport, TransportError, WireRequest, WireResponse};
