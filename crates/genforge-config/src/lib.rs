//! Configuration for genforge
//!
//! The configuration surface is a list of backend definitions plus a global
//! routing strategy. It is read from `.genforge/config.toml` (discovered upward
//! from the working directory) or built programmatically with [`ConfigBuilder`].

mod builder;
mod discovery;
mod model;
mod validation;

pub use builder::ConfigBuilder;
pub use discovery::{CONFIG_ENV_VAR, CliArgs};
pub use model::{
    BackendConfig, BackendFamily, Config, DEFAULT_MAX_RETRIES, DEFAULT_RATE_LIMIT_FLOOR_SECS,
    DEFAULT_RETRY_DELAY_MS, DEFAULT_SERVER_ERROR_COOLDOWN_SECS, DEFAULT_TIMEOUT_SECS,
    GenerationConfig, RoutingConfig, RoutingStrategy,
};
pub use genforge_utils::error::ConfigError;
