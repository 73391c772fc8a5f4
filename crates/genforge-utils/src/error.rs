//! Error taxonomy for genforge
//!
//! Backend-local failures are classified into [`LlmError`] by the transport and
//! adapters. The request executor turns those into [`ClassifiedError`] records
//! (tagged with the backend that produced them) and only surfaces
//! [`ExecutionError`] once every reachable backend is exhausted.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Main error type for genforge operations
#[derive(Error, Debug)]
pub enum GenforgeError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Planning error: {0}")]
    Plan(#[from] PlanError),

    #[error("Execution error: {0}")]
    Execution(#[from] ExecutionError),

    #[error("LLM backend error: {0}")]
    Llm(#[from] LlmError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Trait for providing user-friendly error reporting with context and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;

    /// Get the error category for grouping similar errors
    fn category(&self) -> ErrorCategory;
}

/// Categories of errors for better organization and handling
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Configuration,
    Planning,
    Backend,
    FileSystem,
}

impl fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration => write!(f, "Configuration"),
            Self::Planning => write!(f, "Planning"),
            Self::Backend => write!(f, "Backend"),
            Self::FileSystem => write!(f, "File System"),
        }
    }
}

/// Configuration-related errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Missing required configuration: {0}")]
    MissingRequired(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Credential for backend '{backend}' not found in environment variable '{env_var}'")]
    MissingCredential { backend: String, env_var: String },
}

/// Malformed scheduling input
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PlanError {
    #[error("Duplicate artifact path: {path}")]
    DuplicateArtifact { path: String },

    #[error("Artifact path must not be empty")]
    EmptyPath,
}

/// Machine-readable classification of a backend failure.
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
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum ErrorKind {
    RateLimited,
    AuthenticationFailed,
    ServerError,
    ContentBlocked,
    NetworkOrTimeout,
    MalformedResponse,
    InvalidRequest,
    Misconfiguration,
}

/// A failure produced by one backend during one call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LlmError {
    /// Provider asked us to slow down (HTTP 429)
    #[error("Rate limited: {message}")]
    RateLimited {
        message: String,
        retry_after: Option<Duration>,
    },

    /// Credential rejected (HTTP 401/403)
    #[error("Authentication failed ({status}): {message}")]
    AuthenticationFailed { status: u16, message: String },

    /// Provider-side failure (HTTP 5xx)
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    /// Response withheld by the provider's safety or recitation filters
    #[error("Content blocked: {reason}")]
    ContentBlocked { reason: String },

    /// Call exceeded the backend's hard timeout
    #[error("Timeout after {duration:?}")]
    Timeout { duration: Duration },

    /// Connection-level failure
    #[error("Transport error: {0}")]
    Transport(String),

    /// Response body could not be translated into an envelope
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Any other 4xx
    #[error("Client error ({status}): {message}")]
    ClientError { status: u16, message: String },

    /// Backend cannot be used as configured
    #[error("Misconfiguration: {0}")]
    Misconfiguration(String),
}

impl LlmError {
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::RateLimited { .. } => ErrorKind::RateLimited,
            Self::AuthenticationFailed { .. } => ErrorKind::AuthenticationFailed,
            Self::ServerError { .. } => ErrorKind::ServerError,
            Self::ContentBlocked { .. } => ErrorKind::ContentBlocked,
            Self::Timeout { .. } | Self::Transport(_) => ErrorKind::NetworkOrTimeout,
            Self::MalformedResponse(_) => ErrorKind::MalformedResponse,
            Self::ClientError { .. } => ErrorKind::InvalidRequest,
            Self::Misconfiguration(_) => ErrorKind::Misconfiguration,
        }
    }

    #[must_use]
    pub fn http_status(&self) -> Option<u16> {
        match self {
            Self::RateLimited { .. } => Some(429),
            Self::AuthenticationFailed { status, .. }
            | Self::ServerError { status, .. }
            | Self::ClientError { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Failures worth retrying on the same backend with backoff.
    #[must_use]
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::ServerError { .. } | Self::Timeout { .. } | Self::Transport(_)
        )
    }
}

impl UserFriendlyError for LlmError {
    fn user_message(&self) -> String {
        match self {
            Self::RateLimited { message, .. } => format!("Backend rate limit hit: {message}"),
            Self::AuthenticationFailed { message, .. } => {
                format!("Backend rejected the credential: {message}")
            }
            Self::ServerError { message, .. } => format!("Backend server error: {message}"),
            Self::ContentBlocked { reason } => format!("Backend blocked the response: {reason}"),
            Self::Timeout { duration } => format!("Backend call timed out after {duration:?}"),
            Self::Transport(msg) => format!("Backend unreachable: {msg}"),
            Self::MalformedResponse(msg) => {
                format!("Backend returned an unreadable response: {msg}")
            }
            Self::ClientError { message, .. } => format!("Backend refused the request: {message}"),
            Self::Misconfiguration(msg) => format!("Backend misconfigured: {msg}"),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::RateLimited { .. } => {
                Some("The backend is cooling down and will be retried on a later call.".to_string())
            }
            Self::AuthenticationFailed { .. } => Some(
                "The backend stays disabled until its configuration is reloaded.".to_string(),
            ),
            Self::ServerError { .. } => {
                Some("Server errors put the backend on a short cooldown.".to_string())
            }
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::RateLimited { .. } | Self::ServerError { .. } => vec![
                "Wait a minute and try again".to_string(),
                "Configure an additional backend for failover".to_string(),
            ],
            Self::AuthenticationFailed { .. } => vec![
                "Check the environment variable named by api_key_env".to_string(),
                "Verify the key is valid and has not expired".to_string(),
            ],
            Self::Timeout { .. } | Self::Transport(_) => vec![
                "Check network connectivity to the backend base_url".to_string(),
                "Increase timeout_secs for the backend".to_string(),
            ],
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Misconfiguration(_) => ErrorCategory::Configuration,
            _ => ErrorCategory::Backend,
        }
    }
}

/// A backend failure tagged with the backend that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassifiedError {
    pub kind: ErrorKind,
    pub backend_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub http_status: Option<u16>,
    pub message: String,
}

impl ClassifiedError {
    #[must_use]
    pub fn new(backend_name: impl Into<String>, error: &LlmError) -> Self {
        Self {
            kind: error.kind(),
            backend_name: backend_name.into(),
            http_status: error.http_status(),
            message: crate::redaction::redact_error_message(&error.to_string()),
        }
    }
}

impl fmt::Display for ClassifiedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.http_status {
            Some(status) => write!(
                f,
                "{} [{} {}]: {}",
                self.backend_name, self.kind, status, self.message
            ),
            None => write!(f, "{} [{}]: {}", self.backend_name, self.kind, self.message),
        }
    }
}

/// Errors surfaced by the request executor to its caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExecutionError {
    #[error("All backends exhausted after {} attempt(s); last error: {last}", attempts.len())]
    AllBackendsExhausted {
        attempts: Vec<ClassifiedError>,
        last: ClassifiedError,
    },

    #[error("No backend available ({configured} configured)")]
    NoBackendAvailable { configured: usize },

    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ExecutionError {
    /// One line per attempted backend, in attempt order.
    #[must_use]
    pub fn attempt_report(&self) -> Vec<String> {
        match self {
            Self::AllBackendsExhausted { attempts, .. } => {
                attempts.iter().map(ToString::to_string).collect()
            }
            _ => Vec::new(),
        }
    }

    /// True when every attempted backend failed only because of rate limits.
    #[must_use]
    pub fn is_rate_limited_everywhere(&self) -> bool {
        match self {
            Self::AllBackendsExhausted { attempts, .. } => {
                !attempts.is_empty() && attempts.iter().all(|a| a.kind == ErrorKind::RateLimited)
            }
            _ => false,
        }
    }
}

impl UserFriendlyError for GenforgeError {
    fn user_message(&self) -> String {
        match self {
            Self::Llm(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Execution(err @ ExecutionError::AllBackendsExhausted { .. }) => {
                Some(err.attempt_report().join("\n"))
            }
            Self::Llm(err) => err.context(),
            _ => None,
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(_) => vec![
                "Check .genforge/config.toml or the file passed with --config".to_string(),
            ],
            Self::Execution(err) if err.is_rate_limited_everywhere() => {
                vec!["Every backend is rate limited; retry later".to_string()]
            }
            Self::Execution(ExecutionError::AllBackendsExhausted { attempts, .. })
                if attempts
                    .iter()
                    .all(|a| a.kind == ErrorKind::AuthenticationFailed) =>
            {
                vec!["Every backend rejected its credential; check api_key_env values".to_string()]
            }
            Self::Llm(err) => err.suggestions(),
            _ => Vec::new(),
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            Self::Config(_) => ErrorCategory::Configuration,
            Self::Plan(_) => ErrorCategory::Planning,
            Self::Execution(_) | Self::Llm(_) => ErrorCategory::Backend,
            Self::Io(_) => ErrorCategory::FileSystem,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_llm_error_kinds() {
        let err = LlmError::RateLimited {
            message: "slow down".to_string(),
            retry_after: Some(Duration::from_secs(5)),
        };
        assert_eq!(err.kind(), ErrorKind::RateLimited);
        assert_eq!(err.http_status(), Some(429));
        assert!(!err.is_transient());

        let err = LlmError::Timeout {
            duration: Duration::from_secs(3),
        };
        assert_eq!(err.kind(), ErrorKind::NetworkOrTimeout);
        assert!(err.is_transient());

        let err = LlmError::ServerError {
            status: 503,
            message: "unavailable".to_string(),
        };
        assert_eq!(err.http_status(), Some(503));
        assert!(err.is_transient());
    }

    #[test]
    fn test_error_kind_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorKind::AuthenticationFailed).unwrap();
        assert_eq!(json, r#""authentication_failed""#);
        assert_eq!(ErrorKind::NetworkOrTimeout.to_string(), "network_or_timeout");
    }

    #[test]
    fn test_classified_error_display_includes_backend() {
        let classified = ClassifiedError::new(
            "primary",
            &LlmError::AuthenticationFailed {
                status: 401,
                message: "bad key".to_string(),
            },
        );
        let text = classified.to_string();
        assert!(text.contains("primary"));
        assert!(text.contains("authentication_failed"));
        assert!(text.contains("401"));
    }

    #[test]
    fn test_exhausted_reports_every_attempt() {
        let first = ClassifiedError::new(
            "a",
            &LlmError::RateLimited {
                message: "429".to_string(),
                retry_after: None,
            },
        );
        let second = ClassifiedError::new(
            "b",
            &LlmError::RateLimited {
                message: "429".to_string(),
                retry_after: None,
            },
        );
        let err = ExecutionError::AllBackendsExhausted {
            attempts: vec![first, second.clone()],
            last: second,
        };
        assert_eq!(err.attempt_report().len(), 2);
        assert!(err.is_rate_limited_everywhere());
        assert!(err.to_string().contains("2 attempt(s)"));
    }
}
