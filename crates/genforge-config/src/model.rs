use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use genforge_utils::error::ConfigError;

/// Default per-call timeout in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Default number of same-backend retries for transient failures
pub const DEFAULT_MAX_RETRIES: u32 = 2;

/// Default base delay for exponential backoff in milliseconds
pub const DEFAULT_RETRY_DELAY_MS: u64 = 1000;

/// Minimum cooldown applied after a rate-limit response
pub const DEFAULT_RATE_LIMIT_FLOOR_SECS: u64 = 60;

/// Cooldown applied after a server-side (5xx) failure
pub const DEFAULT_SERVER_ERROR_COOLDOWN_SECS: u64 = 30;

/// Wire-protocol variant spoken by a backend.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum BackendFamily {
    /// Chat-completion style (`messages` in, `choices` out)
    #[serde(alias = "openai")]
    #[strum(to_string = "chat", serialize = "openai")]
    Chat,
    /// Generate-content style (`contents` in, `candidates` out)
    #[serde(alias = "gemini")]
    #[strum(to_string = "generate", serialize = "gemini")]
    Generate,
}

/// Policy for choosing among ready backends.
#[derive(
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum RoutingStrategy {
    /// Highest-priority ready backend
    #[default]
    Failover,
    /// Rotate through ready backends
    RoundRobin,
    /// Uniformly random ready backend
    Random,
    /// Fewest cumulative errors, ties broken by priority
    LeastErrors,
}

/// One upstream completion backend.
///
/// # Example
///
/// ```toml
/// [[backends]]
/// name = "openai"
/// family = "chat"
/// base_url = "https://api.openai.com/v1"
/// api_key_env = "OPENAI_API_KEY"
/// model = "gpt-4o-mini"
/// timeout_secs = 120
/// max_retries = 2
/// retry_delay_ms = 1000
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct BackendConfig {
    pub name: String,
    pub family: BackendFamily,
    pub base_url: String,
    /// Environment variable holding the credential (preferred)
    pub api_key_env: Option<String>,
    /// Inline credential; prefer `api_key_env`
    pub api_key: Option<String>,
    pub model: String,
    pub timeout_secs: Option<u64>,
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    /// Lower is preferred; declaration order breaks ties
    pub priority: Option<u32>,
}

impl BackendConfig {
    #[must_use]
    pub fn new(
        name: impl Into<String>,
        family: BackendFamily,
        base_url: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            family,
            base_url: base_url.into(),
            api_key_env: None,
            api_key: None,
            model: model.into(),
            timeout_secs: None,
            max_retries: None,
            retry_delay_ms: None,
            priority: None,
        }
    }

    #[must_use]
    pub fn with_api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    #[must_use]
    pub fn with_api_key_env(mut self, var: impl Into<String>) -> Self {
        self.api_key_env = Some(var.into());
        self
    }

    #[must_use]
    pub fn with_timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    #[must_use]
    pub fn with_max_retries(mut self, retries: u32) -> Self {
        self.max_retries = Some(retries);
        self
    }

    #[must_use]
    pub fn with_retry_delay_ms(mut self, millis: u64) -> Self {
        self.retry_delay_ms = Some(millis);
        self
    }

    #[must_use]
    pub fn with_priority(mut self, priority: u32) -> Self {
        self.priority = Some(priority);
        self
    }

    #[must_use]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries.unwrap_or(DEFAULT_MAX_RETRIES)
    }

    #[must_use]
    pub fn retry_delay(&self) -> Duration {
        Duration::from_millis(self.retry_delay_ms.unwrap_or(DEFAULT_RETRY_DELAY_MS))
    }

    /// Resolve the credential: environment variable first, then inline key.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingCredential` when `api_key_env` names an unset
    /// variable and no inline key is present, or `ConfigError::MissingRequired`
    /// when neither source is configured.
    pub fn resolve_credential(&self) -> Result<String, ConfigError> {
        if let Some(var) = self.api_key_env.as_deref() {
            match std::env::var(var) {
                Ok(value) if !value.is_empty() => return Ok(value),
                _ => {
                    if let Some(inline) = self.api_key.as_deref() {
                        return Ok(inline.to_string());
                    }
                    return Err(ConfigError::MissingCredential {
                        backend: self.name.clone(),
                        env_var: var.to_string(),
                    });
                }
            }
        }

        self.api_key.clone().ok_or_else(|| {
            ConfigError::MissingRequired(format!(
                "backend '{}' needs api_key_env or api_key",
                self.name
            ))
        })
    }
}

/// `[routing]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct RoutingConfig {
    #[serde(default)]
    pub strategy: RoutingStrategy,
    /// Backend preferred by failover and least-errors routing
    pub primary: Option<String>,
    /// Global cap on distinct backends tried per call
    pub max_provider_retries: Option<usize>,
    pub rate_limit_floor_secs: Option<u64>,
    pub server_error_cooldown_secs: Option<u64>,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            strategy: RoutingStrategy::Failover,
            primary: None,
            max_provider_retries: None,
            rate_limit_floor_secs: Some(DEFAULT_RATE_LIMIT_FLOOR_SECS),
            server_error_cooldown_secs: Some(DEFAULT_SERVER_ERROR_COOLDOWN_SECS),
        }
    }
}

impl RoutingConfig {
    #[must_use]
    pub fn rate_limit_floor(&self) -> Duration {
        Duration::from_secs(
            self.rate_limit_floor_secs
                .unwrap_or(DEFAULT_RATE_LIMIT_FLOOR_SECS),
        )
    }

    #[must_use]
    pub fn server_error_cooldown(&self) -> Duration {
        Duration::from_secs(
            self.server_error_cooldown_secs
                .unwrap_or(DEFAULT_SERVER_ERROR_COOLDOWN_SECS),
        )
    }
}

/// `[generation]` section
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct GenerationConfig {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Per-layer fan-out cap; 0 or unset means unbounded
    pub max_concurrency: Option<usize>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            temperature: Some(0.2),
            max_tokens: None,
            max_concurrency: None,
        }
    }
}

impl GenerationConfig {
    /// `None` when fan-out is unbounded.
    #[must_use]
    pub fn concurrency_cap(&self) -> Option<usize> {
        self.max_concurrency.filter(|&cap| cap > 0)
    }
}

/// Configuration for genforge operations.
///
/// # Configuration File Format
///
/// ```toml
/// [routing]
/// strategy = "failover"
/// primary = "openai"
///
/// [[backends]]
/// name = "openai"
/// family = "chat"
/// base_url = "https://api.openai.com/v1"
/// api_key_env = "OPENAI_API_KEY"
/// model = "gpt-4o-mini"
///
/// [[backends]]
/// name = "gemini"
/// family = "generate"
/// base_url = "https://generativelanguage.googleapis.com/v1beta"
/// api_key_env = "GEMINI_API_KEY"
/// model = "gemini-1.5-flash"
///
/// [generation]
/// temperature = 0.2
/// ```
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub routing: RoutingConfig,
    #[serde(default)]
    pub backends: Vec<BackendConfig>,
    #[serde(default)]
    pub generation: GenerationConfig,
    /// File the configuration was loaded from, if any
    #[serde(skip)]
    pub source: Option<PathBuf>,
}

impl Config {
    /// Start a programmatic configuration.
    #[must_use]
    pub fn builder() -> crate::ConfigBuilder {
        crate::ConfigBuilder::default()
    }

    #[must_use]
    pub fn backend(&self, name: &str) -> Option<&BackendConfig> {
        self.backends.iter().find(|b| b.name == name)
    }
}
