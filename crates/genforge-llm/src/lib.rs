//! Completion backends for genforge
//!
//! A [`BackendRegistry`] tracks the health of every configured backend, a
//! [`RequestExecutor`] routes each call through it with retries and failover,
//! and the [`adapter`] module translates envelopes to and from each backend
//! family's wire format. Network I/O sits behind the [`Transport`] trait.

pub mod adapter;
pub mod backend;
pub mod executor;
mod http_client;
pub mod models;
pub mod registry;
pub mod transport;
pub mod types;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_support;

use std::sync::Arc;

use genforge_config::Config;
use genforge_utils::error::LlmError;

pub use backend::{Backend, BackendStatus, HealthState};
pub use executor::RequestExecutor;
pub use http_client::HttpTransport;
pub use models::{ModelTier, resolve_model};
pub use registry::{BackendRegistry, HealthPolicy};
pub use transport::{Endpoint, Transport};
pub use types::{
    ExecuteOptions, FinishReason, Message, RequestEnvelope, ResponseEnvelope, Role, Usage,
};

/// Build an executor over HTTP for a loaded configuration.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` if the HTTP client cannot be built.
pub fn executor_from_config(config: &Config) -> Result<RequestExecutor, LlmError> {
    let transport = HttpTransport::new()?;
    let registry = BackendRegistry::from_config(config);
    Ok(RequestExecutor::new(Arc::new(registry), Arc::new(transport))
        .with_max_provider_retries(config.routing.max_provider_retries))
}
