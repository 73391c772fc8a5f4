use std::collections::HashSet;

use super::{Config, ConfigError};

fn invalid(key: impl Into<String>, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.into(),
        value: value.into(),
    }
}

impl Config {
    /// Validate configuration values.
    ///
    /// Credentials are not checked here; a backend with an unresolvable
    /// credential is still a valid configuration and starts out unavailable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.backends.is_empty() {
            return Err(ConfigError::MissingRequired(
                "at least one [[backends]] entry".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        for backend in &self.backends {
            let prefix = format!("backends.{}", backend.name);

            if backend.name.trim().is_empty() {
                return Err(invalid("backends.name", "must not be empty"));
            }
            if !seen.insert(backend.name.as_str()) {
                return Err(invalid(
                    "backends.name",
                    format!("duplicate backend name '{}'", backend.name),
                ));
            }
            if backend.base_url.trim().is_empty() {
                return Err(invalid(format!("{prefix}.base_url"), "must not be empty"));
            }
            if !backend.base_url.starts_with("http://") && !backend.base_url.starts_with("https://")
            {
                return Err(invalid(
                    format!("{prefix}.base_url"),
                    "must start with http:// or https://",
                ));
            }
            if backend.model.trim().is_empty() {
                return Err(invalid(format!("{prefix}.model"), "must not be empty"));
            }
            if let Some(timeout) = backend.timeout_secs
                && !(1..=3600).contains(&timeout)
            {
                return Err(invalid(
                    format!("{prefix}.timeout_secs"),
                    "must be between 1 and 3600 seconds",
                ));
            }
            if let Some(retries) = backend.max_retries
                && retries > 10
            {
                return Err(invalid(
                    format!("{prefix}.max_retries"),
                    "exceeds maximum limit of 10",
                ));
            }
        }

        if let Some(primary) = self.routing.primary.as_deref()
            && !self.backends.iter().any(|b| b.name == primary)
        {
            return Err(invalid(
                "routing.primary",
                format!("'{primary}' does not name a configured backend"),
            ));
        }

        if self.routing.max_provider_retries == Some(0) {
            return Err(invalid(
                "routing.max_provider_retries",
                "must be greater than 0",
            ));
        }

        if let Some(temperature) = self.generation.temperature
            && !(0.0..=2.0).contains(&temperature)
        {
            return Err(invalid(
                "generation.temperature",
                "must be between 0.0 and 2.0",
            ));
        }

        if self.generation.max_tokens == Some(0) {
            return Err(invalid("generation.max_tokens", "must be greater than 0"));
        }

        Ok(())
    }
}
