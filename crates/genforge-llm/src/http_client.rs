//! HTTP transport shared by every backend
//!
//! One `reqwest::Client` is built per process and reused for all calls. The
//! transport performs a single attempt per [`Transport::send`]; status codes
//! are classified here and the executor decides what to do with them.

use async_trait::async_trait;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE, HeaderMap, RETRY_AFTER};
use reqwest::{Client, StatusCode};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::adapter::{self, WireRequest, WireResponse};
use crate::transport::{Endpoint, Transport};
use genforge_utils::error::LlmError;
use genforge_utils::redaction::redact_error_message;

/// Default maximum HTTP timeout (5 minutes)
const DEFAULT_MAX_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

/// Default connect timeout (30 seconds)
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest error body excerpt kept in an error message
const MAX_ERROR_BODY_CHARS: usize = 200;

/// Header carrying the credential for generate-family backends
const GOOG_API_KEY_HEADER: &str = "x-goog-api-key";

#[derive(Clone)]
pub struct HttpTransport {
    client: Arc<Client>,
    max_timeout: Duration,
}

impl HttpTransport {
    /// Create a transport with default limits.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn new() -> Result<Self, LlmError> {
        Self::with_max_timeout(DEFAULT_MAX_HTTP_TIMEOUT)
    }

    /// Create a transport whose per-call timeout never exceeds `max_timeout`.
    ///
    /// # Errors
    ///
    /// Returns `LlmError::Misconfiguration` if the client cannot be constructed
    pub fn with_max_timeout(max_timeout: Duration) -> Result<Self, LlmError> {
        let client = Client::builder()
            .connect_timeout(DEFAULT_CONNECT_TIMEOUT)
            .pool_idle_timeout(Duration::from_secs(90))
            .pool_max_idle_per_host(10)
            .build()
            .map_err(|e| {
                LlmError::Misconfiguration(format!("Failed to build HTTP client: {}", e))
            })?;

        Ok(Self {
            client: Arc::new(client),
            max_timeout,
        })
    }

    fn request_for(
        &self,
        endpoint: &Endpoint,
        request: &WireRequest,
    ) -> Result<reqwest::RequestBuilder, LlmError> {
        let base = endpoint.base_url.trim_end_matches('/');
        let builder = match request {
            WireRequest::Chat(body) => self
                .client
                .post(format!("{base}/chat/completions"))
                .header(AUTHORIZATION, format!("Bearer {}", endpoint.credential))
                .json(body),
            WireRequest::Generate(body) => {
                if body.model.is_empty() {
                    return Err(LlmError::Misconfiguration(format!(
                        "backend '{}' has no model for generateContent",
                        endpoint.name
                    )));
                }
                self.client
                    .post(format!("{base}/models/{}:generateContent", body.model))
                    .header(GOOG_API_KEY_HEADER, &endpoint.credential)
                    .json(body)
            }
        };
        Ok(builder.header(CONTENT_TYPE, "application/json"))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &WireRequest,
        timeout: Duration,
    ) -> Result<WireResponse, LlmError> {
        let effective_timeout = timeout.min(self.max_timeout);

        debug!(
            backend = %endpoint.name,
            family = %endpoint.family,
            model = %request.model(),
            timeout_secs = effective_timeout.as_secs(),
            "Sending HTTP request"
        );

        let response = self
            .request_for(endpoint, request)?
            .timeout(effective_timeout)
            .send()
            .await
            .map_err(|e| map_send_error(&e, effective_timeout, &endpoint.name))?;

        let status = response.status();
        if !status.is_success() {
            let retry_after = parse_retry_after(response.headers());
            let body = response.text().await.unwrap_or_default();
            return Err(map_status(status, retry_after, &body, &endpoint.name));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| map_send_error(&e, effective_timeout, &endpoint.name))?;

        adapter::decode_response(request.family(), &bytes).map_err(|e| match e {
            LlmError::MalformedResponse(detail) => {
                LlmError::MalformedResponse(format!("{} returned {detail}", endpoint.name))
            }
            other => other,
        })
    }
}

fn map_send_error(error: &reqwest::Error, timeout: Duration, backend: &str) -> LlmError {
    if error.is_timeout() {
        return LlmError::Timeout { duration: timeout };
    }
    LlmError::Transport(format!(
        "{} request failed: {}",
        backend,
        redact_error_message(&error.to_string())
    ))
}

/// Classify a non-success status code.
///
/// - 401/403 → `AuthenticationFailed`
/// - 429 → `RateLimited`
/// - 5xx → `ServerError`
/// - other 4xx → `ClientError`
fn map_status(
    status: StatusCode,
    retry_after: Option<Duration>,
    body: &str,
    backend: &str,
) -> LlmError {
    let message = format!("{} returned {}: {}", backend, status, excerpt(body));
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => LlmError::AuthenticationFailed {
            status: status.as_u16(),
            message,
        },
        StatusCode::TOO_MANY_REQUESTS => LlmError::RateLimited {
            message,
            retry_after,
        },
        s if s.is_server_error() => LlmError::ServerError {
            status: s.as_u16(),
            message,
        },
        s => LlmError::ClientError {
            status: s.as_u16(),
            message,
        },
    }
}

fn excerpt(body: &str) -> String {
    let trimmed: String = body.trim().chars().take(MAX_ERROR_BODY_CHARS).collect();
    redact_error_message(&trimmed)
}

/// `Retry-After` in delta-seconds form. HTTP-date values are ignored.
fn parse_retry_after(headers: &HeaderMap) -> Option<Duration> {
    headers
        .get(RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse::<u64>()
        .ok()
        .map(Duration::from_secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::header::HeaderValue;

    #[test]
    fn test_map_status_classification() {
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, None, "", "a"),
            LlmError::AuthenticationFailed { status: 401, .. }
        ));
        assert!(matches!(
            map_status(StatusCode::FORBIDDEN, None, "", "a"),
            LlmError::AuthenticationFailed { status: 403, .. }
        ));
        assert!(matches!(
            map_status(StatusCode::SERVICE_UNAVAILABLE, None, "", "a"),
            LlmError::ServerError { status: 503, .. }
        ));
        assert!(matches!(
            map_status(StatusCode::BAD_REQUEST, None, "", "a"),
            LlmError::ClientError { status: 400, .. }
        ));
    }

    #[test]
    fn test_rate_limit_keeps_retry_after() {
        let err = map_status(
            StatusCode::TOO_MANY_REQUESTS,
            Some(Duration::from_secs(12)),
            "slow down",
            "a",
        );
        match err {
            LlmError::RateLimited {
                retry_after,
                message,
            } => {
                assert_eq!(retry_after, Some(Duration::from_secs(12)));
                assert!(message.contains("slow down"));
            }
            other => panic!("Expected RateLimited, got {:?}", other),
        }
    }

    #[test]
    fn test_parse_retry_after() {
        let mut headers = HeaderMap::new();
        assert_eq!(parse_retry_after(&headers), None);

        headers.insert(RETRY_AFTER, HeaderValue::from_static("30"));
        assert_eq!(parse_retry_after(&headers), Some(Duration::from_secs(30)));

        headers.insert(
            RETRY_AFTER,
            HeaderValue::from_static("Wed, 21 Oct 2015 07:28:00 GMT"),
        );
        assert_eq!(parse_retry_after(&headers), None);
    }

    #[test]
    fn test_error_body_is_redacted_and_truncated() {
        let key = "a".repeat(40);
        let body = format!("invalid key {key} {}", "x".repeat(500));
        let err = map_status(StatusCode::BAD_REQUEST, None, &body, "a");
        let text = err.to_string();
        assert!(!text.contains(&key));
        assert!(text.len() < 400);
    }

    #[test]
    fn test_transport_builds() {
        assert!(HttpTransport::new().is_ok());
    }
}
