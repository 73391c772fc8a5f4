//! In-memory transport for tests
//!
//! [`ScriptedTransport`] answers each backend from a queue of scripted
//! outcomes, falling back to a fixed outcome or a responder closure once the
//! queue is empty, and records every call it sees.

use async_trait::async_trait;
use std::collections::{HashMap, VecDeque};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use crate::adapter::chat::{ChatChoice, ChatResponseMessage, ChatUsage};
use crate::adapter::generate::{Candidate, Content, Part, UsageMetadata};
use crate::adapter::{ChatResponse, GenerateResponse, WireRequest, WireResponse};
use crate::transport::{Endpoint, Transport};
use genforge_config::BackendFamily;
use genforge_utils::error::LlmError;

type Responder =
    Box<dyn Fn(&Endpoint, &WireRequest) -> Result<WireResponse, LlmError> + Send + Sync>;

/// One call observed by [`ScriptedTransport`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub backend: String,
    pub model: String,
    pub last_user_message: Option<String>,
}

#[derive(Default)]
pub struct ScriptedTransport {
    scripts: Mutex<HashMap<String, VecDeque<Result<WireResponse, LlmError>>>>,
    fixed: Mutex<HashMap<String, Result<WireResponse, LlmError>>>,
    responder: Option<Responder>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedTransport {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer every unscripted call with `responder`.
    #[must_use]
    pub fn with_responder<F>(mut self, responder: F) -> Self
    where
        F: Fn(&Endpoint, &WireRequest) -> Result<WireResponse, LlmError> + Send + Sync + 'static,
    {
        self.responder = Some(Box::new(responder));
        self
    }

    /// Echo the final user turn back, in the right wire format for the backend.
    #[must_use]
    pub fn echo() -> Self {
        Self::new().with_responder(|endpoint, request| {
            let text = request.last_user_text().unwrap_or_default();
            Ok(reply(endpoint.family, &format!("generated: {text}")))
        })
    }

    /// Queue one outcome for `backend`.
    pub fn push(&self, backend: &str, outcome: Result<WireResponse, LlmError>) -> &Self {
        self.scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entry(backend.to_string())
            .or_default()
            .push_back(outcome);
        self
    }

    /// Answer `backend` with `outcome` whenever its queue is empty.
    pub fn always(&self, backend: &str, outcome: Result<WireResponse, LlmError>) -> &Self {
        self.fixed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(backend.to_string(), outcome);
        self
    }

    #[must_use]
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[must_use]
    pub fn call_count(&self, backend: &str) -> usize {
        self.calls().iter().filter(|c| c.backend == backend).count()
    }

    /// Backends called, in order of first call.
    #[must_use]
    pub fn distinct_backends(&self) -> Vec<String> {
        let mut seen: Vec<String> = Vec::new();
        for call in self.calls() {
            if !seen.contains(&call.backend) {
                seen.push(call.backend);
            }
        }
        seen
    }
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn send(
        &self,
        endpoint: &Endpoint,
        request: &WireRequest,
        _timeout: Duration,
    ) -> Result<WireResponse, LlmError> {
        self.calls
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(RecordedCall {
                backend: endpoint.name.clone(),
                model: request.model().to_string(),
                last_user_message: request.last_user_text(),
            });

        let scripted = self
            .scripts
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get_mut(&endpoint.name)
            .and_then(VecDeque::pop_front);
        if let Some(outcome) = scripted {
            return outcome;
        }

        let fixed = self
            .fixed
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&endpoint.name)
            .cloned();
        if let Some(outcome) = fixed {
            return outcome;
        }

        match &self.responder {
            Some(responder) => responder(endpoint, request),
            None => Err(LlmError::Transport(format!(
                "no scripted reply for backend '{}'",
                endpoint.name
            ))),
        }
    }
}

/// A successful reply in the wire format of `family`.
#[must_use]
pub fn reply(family: BackendFamily, content: &str) -> WireResponse {
    match family {
        BackendFamily::Chat => chat_reply(content),
        BackendFamily::Generate => generate_reply(content),
    }
}

#[must_use]
pub fn chat_reply(content: &str) -> WireResponse {
    WireResponse::Chat(ChatResponse {
        model: None,
        choices: vec![ChatChoice {
            message: ChatResponseMessage {
                role: Some("assistant".to_string()),
                content: Some(content.to_string()),
            },
            finish_reason: Some("stop".to_string()),
        }],
        usage: Some(ChatUsage {
            prompt_tokens: 10,
            completion_tokens: 5,
            total_tokens: Some(15),
        }),
    })
}

#[must_use]
pub fn generate_reply(content: &str) -> WireResponse {
    WireResponse::Generate(GenerateResponse {
        candidates: vec![Candidate {
            content: Some(Content {
                role: "model".to_string(),
                parts: vec![Part {
                    text: content.to_string(),
                }],
            }),
            finish_reason: Some("STOP".to_string()),
        }],
        usage_metadata: Some(UsageMetadata {
            prompt_token_count: 10,
            candidates_token_count: 5,
            total_token_count: Some(15),
        }),
        prompt_feedback: None,
        model_version: None,
    })
}

#[must_use]
pub fn rate_limited(retry_after_secs: Option<u64>) -> LlmError {
    LlmError::RateLimited {
        message: "429 Too Many Requests".to_string(),
        retry_after: retry_after_secs.map(Duration::from_secs),
    }
}

#[must_use]
pub fn server_error(status: u16) -> LlmError {
    LlmError::ServerError {
        status,
        message: format!("{status} upstream failure"),
    }
}

#[must_use]
pub fn auth_failure() -> LlmError {
    LlmError::AuthenticationFailed {
        status: 401,
        message: "invalid api key".to_string(),
    }
}
