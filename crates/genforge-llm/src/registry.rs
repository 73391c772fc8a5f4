//! Backend registry and routing
//!
//! Backends are kept in preference order: the configured primary first, then
//! ascending `priority`, then declaration order. Every routing strategy walks
//! that order, so ties always resolve toward the preferred backend.

use chrono::{DateTime, Utc};
use rand::Rng;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::backend::{Backend, BackendStatus};
use genforge_config::{BackendConfig, Config, RoutingConfig, RoutingStrategy};
use genforge_utils::clock::{Clock, SystemClock};
use genforge_utils::error::{ExecutionError, LlmError};

/// How long a backend sits out after a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HealthPolicy {
    /// Minimum rate-limit cooldown, applied even when the provider hints lower
    pub rate_limit_floor: Duration,
    pub server_error_cooldown: Duration,
}

impl From<&RoutingConfig> for HealthPolicy {
    fn from(routing: &RoutingConfig) -> Self {
        Self {
            rate_limit_floor: routing.rate_limit_floor(),
            server_error_cooldown: routing.server_error_cooldown(),
        }
    }
}

impl HealthPolicy {
    /// Cooldown for a rate-limit response: the larger of the floor and the hint.
    #[must_use]
    pub fn rate_limit_cooldown(&self, retry_after: Option<Duration>) -> Duration {
        retry_after.map_or(self.rate_limit_floor, |hint| hint.max(self.rate_limit_floor))
    }
}

#[derive(Debug)]
pub struct BackendRegistry {
    backends: Vec<Arc<Backend>>,
    strategy: RoutingStrategy,
    policy: HealthPolicy,
    clock: Arc<dyn Clock>,
    cursor: AtomicUsize,
}

impl BackendRegistry {
    /// Build a registry over `configs`, ordered for routing.
    #[must_use]
    pub fn new(configs: &[BackendConfig], routing: &RoutingConfig, clock: Arc<dyn Clock>) -> Self {
        let mut ordered: Vec<(usize, &BackendConfig)> = configs.iter().enumerate().collect();
        ordered.sort_by_key(|(index, config)| {
            let is_primary = routing.primary.as_deref() == Some(config.name.as_str());
            (!is_primary, config.priority.unwrap_or(u32::MAX), *index)
        });

        let backends: Vec<Arc<Backend>> = ordered
            .into_iter()
            .map(|(_, config)| Arc::new(Backend::new(config.clone())))
            .collect();

        for backend in backends.iter().filter(|b| b.is_disabled()) {
            warn!(
                backend = %backend.name(),
                "Backend starts unavailable: no credential could be resolved"
            );
        }

        Self {
            backends,
            strategy: routing.strategy,
            policy: HealthPolicy::from(routing),
            clock,
            cursor: AtomicUsize::new(0),
        }
    }

    /// Registry for a loaded configuration, on the system clock.
    #[must_use]
    pub fn from_config(config: &Config) -> Self {
        Self::new(&config.backends, &config.routing, Arc::new(SystemClock))
    }

    /// Same as [`from_config`](Self::from_config) with an explicit clock.
    #[must_use]
    pub fn with_clock(config: &Config, clock: Arc<dyn Clock>) -> Self {
        Self::new(&config.backends, &config.routing, clock)
    }

    /// Every configured backend in preference order, ready or not.
    #[must_use]
    pub fn all_backends(&self) -> &[Arc<Backend>] {
        &self.backends
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Arc<Backend>> {
        self.backends.iter().find(|b| b.name() == name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.backends.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    #[must_use]
    pub fn strategy(&self) -> RoutingStrategy {
        self.strategy
    }

    #[must_use]
    pub fn policy(&self) -> HealthPolicy {
        self.policy
    }

    #[must_use]
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    /// Whether any backend outside `excluded` could still be selected.
    #[must_use]
    pub fn has_candidates(&self, excluded: &[String]) -> bool {
        self.backends
            .iter()
            .any(|b| !excluded.iter().any(|e| e == b.name()) && !b.is_disabled())
    }

    /// Pick a backend that is not in `excluded`.
    ///
    /// Ready backends are chosen by `strategy`. When none is ready, the
    /// candidate whose last failure is oldest is returned so a call never stalls
    /// on cooldowns alone. Disabled backends are never returned.
    ///
    /// # Errors
    ///
    /// `ExecutionError::NoBackendAvailable` when every backend is excluded or
    /// disabled.
    pub fn select_backend(
        &self,
        excluded: &[String],
        strategy: RoutingStrategy,
    ) -> Result<Arc<Backend>, ExecutionError> {
        let now = self.clock.now();
        let candidates: Vec<&Arc<Backend>> = self
            .backends
            .iter()
            .filter(|b| !excluded.iter().any(|e| e == b.name()))
            .collect();

        let ready: Vec<&Arc<Backend>> = candidates
            .iter()
            .copied()
            .filter(|b| b.is_ready(now))
            .collect();

        if let Some(chosen) = self.apply_strategy(&ready, strategy) {
            debug!(backend = %chosen.name(), strategy = %strategy, "Selected backend");
            return Ok(Arc::clone(chosen));
        }

        let fallback = candidates
            .iter()
            .copied()
            .filter(|b| !b.is_disabled())
            .min_by_key(|b| b.last_failure_at());

        match fallback {
            Some(backend) => {
                debug!(
                    backend = %backend.name(),
                    "No backend ready; using least recently failed"
                );
                Ok(Arc::clone(backend))
            }
            None => Err(ExecutionError::NoBackendAvailable {
                configured: self.backends.len(),
            }),
        }
    }

    fn apply_strategy<'a>(
        &self,
        ready: &[&'a Arc<Backend>],
        strategy: RoutingStrategy,
    ) -> Option<&'a Arc<Backend>> {
        if ready.is_empty() {
            return None;
        }
        let chosen = match strategy {
            RoutingStrategy::Failover => ready[0],
            RoutingStrategy::RoundRobin => {
                let index = self.cursor.fetch_add(1, Ordering::Relaxed) % ready.len();
                ready[index]
            }
            RoutingStrategy::Random => ready[rand::thread_rng().gen_range(0..ready.len())],
            RoutingStrategy::LeastErrors => ready
                .iter()
                .copied()
                .min_by_key(|b| b.error_count())
                .unwrap_or(ready[0]),
        };
        Some(chosen)
    }

    pub fn record_success(&self, backend: &Backend) {
        backend.record_success();
    }

    /// Update a backend's health after a failed call.
    pub fn record_failure(&self, backend: &Backend, error: &LlmError) {
        let now = self.clock.now();
        let message = error.to_string();
        match error {
            LlmError::RateLimited { retry_after, .. } => {
                let cooldown = self.policy.rate_limit_cooldown(*retry_after);
                info!(
                    backend = %backend.name(),
                    cooldown_secs = cooldown.as_secs(),
                    "Backend rate limited"
                );
                backend.record_rate_limited(now, cooldown, message);
            }
            LlmError::AuthenticationFailed { .. } => {
                warn!(
                    backend = %backend.name(),
                    "Backend credential rejected; disabled until reset"
                );
                backend.record_auth_failure(now, message);
            }
            LlmError::ServerError { .. } => {
                backend.record_server_error(now, self.policy.server_error_cooldown, message);
            }
            _ => backend.record_failure(now, message),
        }
    }

    /// Health snapshot of every backend, in preference order.
    #[must_use]
    pub fn snapshot(&self) -> Vec<BackendStatus> {
        let now = self.clock.now();
        self.backends.iter().map(|b| b.status(now)).collect()
    }

    /// Clear one backend's health history. Returns false for unknown names.
    pub fn reset(&self, name: &str) -> bool {
        match self.get(name) {
            Some(backend) => {
                backend.reset();
                info!(backend = %name, "Backend health reset");
                true
            }
            None => false,
        }
    }

    pub fn reset_all(&self) {
        for backend in &self.backends {
            backend.reset();
        }
        info!(backends = self.backends.len(), "All backend health reset");
    }

    /// Re-resolve credentials for backends named in `config`.
    ///
    /// Returns how many backends were reloaded. Names not already registered
    /// are ignored.
    pub fn reload(&self, config: &Config) -> usize {
        let mut reloaded = 0;
        for backend_config in &config.backends {
            if let Some(backend) = self.get(&backend_config.name) {
                backend.reload(backend_config);
                reloaded += 1;
            }
        }
        info!(reloaded = reloaded, "Backend configuration reloaded");
        reloaded
    }
}
