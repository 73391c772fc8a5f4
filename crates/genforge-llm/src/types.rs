//! Provider-neutral request and response envelopes

use serde::{Deserialize, Serialize};

use genforge_config::{BackendFamily, RoutingStrategy};
use genforge_utils::error::ExecutionError;

/// Default sampling temperature when the caller does not pick one
pub const DEFAULT_TEMPERATURE: f32 = 0.2;

/// Role of a conversation turn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, strum::Display)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One conversation turn
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    #[must_use]
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    #[must_use]
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    #[must_use]
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }
}

/// A completion request as callers see it, independent of any wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RequestEnvelope {
    pub messages: Vec<Message>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    /// Requested model; a tier name (`fast`, `strong`), a concrete model name,
    /// or `None` for each backend's configured default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
}

impl RequestEnvelope {
    #[must_use]
    pub fn new(messages: Vec<Message>) -> Self {
        Self {
            messages,
            temperature: DEFAULT_TEMPERATURE,
            max_tokens: None,
            model: None,
        }
    }

    #[must_use]
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    #[must_use]
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    /// Reject requests no backend could answer.
    ///
    /// # Errors
    ///
    /// Returns `ExecutionError::InvalidRequest` for an empty conversation, a
    /// conversation made only of system turns, or an out-of-range temperature.
    pub fn validate(&self) -> Result<(), ExecutionError> {
        if self.messages.is_empty() {
            return Err(ExecutionError::InvalidRequest(
                "request has no messages".to_string(),
            ));
        }
        if self.messages.iter().all(|m| m.role == Role::System) {
            return Err(ExecutionError::InvalidRequest(
                "request has no user or assistant turn".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ExecutionError::InvalidRequest(format!(
                "temperature {} outside 0.0..=2.0",
                self.temperature
            )));
        }
        Ok(())
    }

    /// Apply per-call overrides from [`ExecuteOptions`].
    #[must_use]
    pub fn with_options(&self, options: &ExecuteOptions) -> Self {
        let mut envelope = self.clone();
        if let Some(temperature) = options.temperature {
            envelope.temperature = temperature;
        }
        if options.max_tokens.is_some() {
            envelope.max_tokens = options.max_tokens;
        }
        if options.model.is_some() {
            envelope.model.clone_from(&options.model);
        }
        envelope
    }

    /// Text of the final user turn, if any.
    #[must_use]
    pub fn last_user_message(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|m| m.role == Role::User)
            .map(|m| m.content.as_str())
    }
}

/// Why generation stopped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FinishReason {
    Stop,
    /// Output hit the token limit and is probably truncated
    Length,
    Other(String),
}

impl FinishReason {
    #[must_use]
    pub fn is_truncated(&self) -> bool {
        matches!(self, Self::Length)
    }
}

/// Token accounting reported by the backend
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

impl Usage {
    #[must_use]
    pub fn new(prompt_tokens: u64, completion_tokens: u64) -> Self {
        Self {
            prompt_tokens,
            completion_tokens,
            total_tokens: prompt_tokens + completion_tokens,
        }
    }

    pub fn add(&mut self, other: &Usage) {
        self.prompt_tokens += other.prompt_tokens;
        self.completion_tokens += other.completion_tokens;
        self.total_tokens += other.total_tokens;
    }
}

/// A completion result as callers see it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseEnvelope {
    pub content: String,
    pub finish_reason: FinishReason,
    pub usage: Usage,
    /// Backend that served the call
    pub backend: String,
    /// Model that produced the content
    pub model: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<String>,
}

impl ResponseEnvelope {
    #[must_use]
    pub fn new(content: impl Into<String>, finish_reason: FinishReason, usage: Usage) -> Self {
        Self {
            content: content.into(),
            finish_reason,
            usage,
            backend: String::new(),
            model: String::new(),
            warnings: Vec::new(),
        }
    }

    #[must_use]
    pub fn is_truncated(&self) -> bool {
        self.finish_reason.is_truncated()
    }
}

/// Per-call overrides for [`crate::RequestExecutor::execute`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExecuteOptions {
    /// Restrict the call to backends of one family
    pub provider: Option<BackendFamily>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    /// Cap on distinct backends tried; clamped to the number available
    pub max_provider_retries: Option<usize>,
    pub strategy: Option<RoutingStrategy>,
}

impl ExecuteOptions {
    #[must_use]
    pub fn with_provider(mut self, provider: BackendFamily) -> Self {
        self.provider = Some(provider);
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_max_provider_retries(mut self, max: usize) -> Self {
        self.max_provider_retries = Some(max);
        self
    }

    #[must_use]
    pub fn with_strategy(mut self, strategy: RoutingStrategy) -> Self {
        self.strategy = Some(strategy);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_empty_and_system_only() {
        assert!(RequestEnvelope::new(vec![]).validate().is_err());
        assert!(
            RequestEnvelope::new(vec![Message::system("rules")])
                .validate()
                .is_err()
        );
        assert!(
            RequestEnvelope::new(vec![Message::system("rules"), Message::user("hi")])
                .validate()
                .is_ok()
        );
    }

    #[test]
    fn test_validate_rejects_bad_temperature() {
        let envelope = RequestEnvelope::new(vec![Message::user("hi")]).with_temperature(3.5);
        assert!(matches!(
            envelope.validate(),
            Err(ExecutionError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_options_override_envelope() {
        let envelope = RequestEnvelope::new(vec![Message::user("hi")]).with_max_tokens(100);
        let options = ExecuteOptions {
            temperature: Some(0.9),
            model: Some("fast".to_string()),
            ..ExecuteOptions::default()
        };
        let merged = envelope.with_options(&options);
        assert_eq!(merged.temperature, 0.9);
        assert_eq!(merged.max_tokens, Some(100));
        assert_eq!(merged.model.as_deref(), Some("fast"));
    }

    #[test]
    fn test_usage_add() {
        let mut total = Usage::default();
        total.add(&Usage::new(10, 5));
        total.add(&Usage::new(1, 2));
        assert_eq!(total.total_tokens, 18);
        assert_eq!(total.prompt_tokens, 11);
    }

    #[test]
    fn test_last_user_message() {
        let envelope = RequestEnvelope::new(vec![
            Message::user("first"),
            Message::assistant("reply"),
            Message::user("second"),
        ]);
        assert_eq!(envelope.last_user_message(), Some("second"));
    }
}
