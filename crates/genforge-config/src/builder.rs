//! Programmatic configuration for embedding and tests.

use super::{
    BackendConfig, Config, ConfigError, GenerationConfig, RoutingConfig, RoutingStrategy,
};

/// Builder for [`Config`] that does not touch the filesystem.
///
/// # Example
///
/// ```rust
/// use genforge_config::{BackendConfig, BackendFamily, Config, RoutingStrategy};
///
/// let config = Config::builder()
///     .backend(
///         BackendConfig::new("local", BackendFamily::Chat, "http://127.0.0.1:8080/v1", "gpt-4o-mini")
///             .with_api_key("test"),
///     )
///     .strategy(RoutingStrategy::Failover)
///     .build()
///     .expect("valid config");
/// assert_eq!(config.backends.len(), 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    backends: Vec<BackendConfig>,
    routing: RoutingConfig,
    generation: GenerationConfig,
}

impl ConfigBuilder {
    #[must_use]
    pub fn backend(mut self, backend: BackendConfig) -> Self {
        self.backends.push(backend);
        self
    }

    #[must_use]
    pub fn strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.routing.strategy = strategy;
        self
    }

    #[must_use]
    pub fn primary(mut self, name: impl Into<String>) -> Self {
        self.routing.primary = Some(name.into());
        self
    }

    #[must_use]
    pub fn max_provider_retries(mut self, max: usize) -> Self {
        self.routing.max_provider_retries = Some(max);
        self
    }

    #[must_use]
    pub fn rate_limit_floor_secs(mut self, secs: u64) -> Self {
        self.routing.rate_limit_floor_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn server_error_cooldown_secs(mut self, secs: u64) -> Self {
        self.routing.server_error_cooldown_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.generation.temperature = Some(temperature);
        self
    }

    #[must_use]
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.generation.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn max_concurrency(mut self, cap: usize) -> Self {
        self.generation.max_concurrency = Some(cap);
        self
    }

    /// Build and validate.
    ///
    /// # Errors
    ///
    /// Returns the first validation failure.
    pub fn build(self) -> Result<Config, ConfigError> {
        let config = Config {
            routing: self.routing,
            backends: self.backends,
            generation: self.generation,
            source: None,
        };
        config.validate()?;
        Ok(config)
    }
}
