use async_trait::async_trait;
use std::fmt;
use std::time::Duration;

use crate::adapter::{WireRequest, WireResponse};
use genforge_config::BackendFamily;
use genforge_utils::error::LlmError;

/// Where and how to reach one backend for a single call.
#[derive(Clone)]
pub struct Endpoint {
    pub name: String,
    pub family: BackendFamily,
    pub base_url: String,
    pub credential: String,
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("name", &self.name)
            .field("family", &self.family)
            .field("base_url", &self.base_url)
            .field("credential", &"<redacted>")
            .finish()
    }
}

/// Sends one wire request and returns the parsed wire response.
///
/// Implementations classify failures into [`LlmError`] and never retry;
/// retries and failover belong to the executor.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &WireRequest,
        timeout: Duration,
    ) -> Result<WireResponse, LlmError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_debug_hides_credential() {
        let endpoint = Endpoint {
            name: "a".to_string(),
            family: BackendFamily::Chat,
            base_url: "https://x".to_string(),
            credential: "sk-secret".to_string(),
        };
        let text = format!("{:?}", endpoint);
        assert!(!text.contains("sk-secret"));
        assert!(text.contains("<redacted>"));
    }
}
