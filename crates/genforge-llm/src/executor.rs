//! Request executor: retries, failover, and error aggregation
//!
//! One logical call tries up to `max_provider_retries` distinct backends.
//! Within a backend, transient failures (server errors, timeouts, connection
//! errors) are retried with exponential backoff up to the backend's
//! `max_retries`. A rate limit moves on to the next backend immediately; it is
//! waited out in place only when no other backend is left to try.

use std::sync::Arc;
use std::time::Duration;
use tracing::{Instrument, debug, info, warn};

use crate::adapter;
use crate::backend::Backend;
use crate::models::resolve_model;
use crate::registry::BackendRegistry;
use crate::transport::Transport;
use crate::types::{ExecuteOptions, RequestEnvelope, ResponseEnvelope};
use genforge_utils::error::{ClassifiedError, ExecutionError, LlmError};
use genforge_utils::logging::request_span;

pub struct RequestExecutor {
    registry: Arc<BackendRegistry>,
    transport: Arc<dyn Transport>,
    max_provider_retries: Option<usize>,
}

impl RequestExecutor {
    #[must_use]
    pub fn new(registry: Arc<BackendRegistry>, transport: Arc<dyn Transport>) -> Self {
        Self {
            registry,
            transport,
            max_provider_retries: None,
        }
    }

    /// Default cap on distinct backends per call; per-call options win.
    #[must_use]
    pub fn with_max_provider_retries(mut self, max: Option<usize>) -> Self {
        self.max_provider_retries = max;
        self
    }

    #[must_use]
    pub fn registry(&self) -> &Arc<BackendRegistry> {
        &self.registry
    }

    /// Run one logical completion call.
    ///
    /// # Errors
    ///
    /// - `InvalidRequest` when the envelope cannot be sent anywhere
    /// - `NoBackendAvailable` when no backend could even be attempted
    /// - `AllBackendsExhausted` with every attempt's classified error
    pub async fn execute(
        &self,
        envelope: &RequestEnvelope,
        options: &ExecuteOptions,
    ) -> Result<ResponseEnvelope, ExecutionError> {
        let envelope = envelope.with_options(options);
        envelope.validate()?;

        let mut excluded: Vec<String> = match options.provider {
            Some(family) => self
                .registry
                .all_backends()
                .iter()
                .filter(|b| b.family() != family)
                .map(|b| b.name().to_string())
                .collect(),
            None => Vec::new(),
        };

        let available = self.registry.len() - excluded.len();
        if available == 0 {
            return Err(ExecutionError::NoBackendAvailable {
                configured: self.registry.len(),
            });
        }

        let max = options
            .max_provider_retries
            .or(self.max_provider_retries)
            .unwrap_or(available)
            .clamp(1, available);
        let strategy = options.strategy.unwrap_or(self.registry.strategy());

        async {
            let mut attempts: Vec<ClassifiedError> = Vec::new();

            for round in 0..max {
                let backend = match self.registry.select_backend(&excluded, strategy) {
                    Ok(backend) => backend,
                    Err(err) if attempts.is_empty() => return Err(err),
                    Err(_) => break,
                };
                excluded.push(backend.name().to_string());

                let alternatives_remain =
                    round + 1 < max && self.registry.has_candidates(&excluded);

                match self
                    .attempt_backend(&backend, &envelope, alternatives_remain)
                    .await
                {
                    Ok(response) => return Ok(response),
                    Err(err) => {
                        warn!(
                            backend = %backend.name(),
                            kind = %err.kind(),
                            "Backend attempt failed"
                        );
                        attempts.push(ClassifiedError::new(backend.name(), &err));
                    }
                }
            }

            match attempts.last().cloned() {
                Some(last) => Err(ExecutionError::AllBackendsExhausted { attempts, last }),
                None => Err(ExecutionError::NoBackendAvailable {
                    configured: self.registry.len(),
                }),
            }
        }
        .instrument(request_span(max))
        .await
    }

    /// All tries against one backend, including same-backend retries.
    async fn attempt_backend(
        &self,
        backend: &Backend,
        envelope: &RequestEnvelope,
        alternatives_remain: bool,
    ) -> Result<ResponseEnvelope, LlmError> {
        let endpoint = match backend.endpoint() {
            Ok(endpoint) => endpoint,
            Err(err) => {
                self.registry.record_failure(backend, &err);
                return Err(err);
            }
        };

        let model = resolve_model(backend.family(), backend.model(), envelope.model.as_deref());
        let request = adapter::to_wire(backend.family(), envelope, &model);
        let timeout = backend.timeout();
        let max_retries = backend.config().max_retries();
        let retry_delay = backend.config().retry_delay();

        let mut retry = 0u32;
        loop {
            debug!(
                backend = %backend.name(),
                model = %model,
                retry = retry,
                "Calling backend"
            );

            let call = self.transport.send(&endpoint, &request, timeout);
            let outcome = match tokio::time::timeout(timeout, call).await {
                Ok(result) => result.and_then(adapter::from_wire),
                Err(_) => Err(LlmError::Timeout { duration: timeout }),
            };

            let err = match outcome {
                Ok(mut response) => {
                    self.registry.record_success(backend);
                    response.backend = backend.name().to_string();
                    if response.model.is_empty() {
                        response.model = model;
                    }
                    for warning in &response.warnings {
                        warn!(backend = %backend.name(), warning = %warning, "Response warning");
                    }
                    info!(
                        backend = %backend.name(),
                        total_tokens = response.usage.total_tokens,
                        "Backend call succeeded"
                    );
                    return Ok(response);
                }
                Err(err) => err,
            };

            self.registry.record_failure(backend, &err);

            let wait = match &err {
                LlmError::RateLimited { retry_after, .. }
                    if !alternatives_remain && retry < max_retries =>
                {
                    Some(self.registry.policy().rate_limit_cooldown(*retry_after))
                }
                e if e.is_transient() && retry < max_retries => {
                    Some(backoff_delay(retry_delay, retry))
                }
                _ => None,
            };

            match wait {
                Some(delay) => {
                    debug!(
                        backend = %backend.name(),
                        kind = %err.kind(),
                        delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                        "Retrying same backend"
                    );
                    tokio::time::sleep(delay).await;
                    retry += 1;
                }
                None => return Err(err),
            }
        }
    }
}

/// `base * 2^retry`, saturating.
#[must_use]
pub fn backoff_delay(base: Duration, retry: u32) -> Duration {
    base.saturating_mul(2u32.saturating_pow(retry))
}
