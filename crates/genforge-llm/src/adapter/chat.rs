//! Chat-completion wire format (`messages` in, `choices` out)

use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, Message, RequestEnvelope, ResponseEnvelope, Usage};
use genforge_utils::error::LlmError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
    pub stream: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    #[serde(default)]
    pub usage: Option<ChatUsage>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatChoice {
    pub message: ChatResponseMessage,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatResponseMessage {
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub content: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ChatUsage {
    #[serde(default)]
    pub prompt_tokens: u64,
    #[serde(default)]
    pub completion_tokens: u64,
    #[serde(default)]
    pub total_tokens: Option<u64>,
}

fn convert_message(message: &Message) -> ChatMessage {
    ChatMessage {
        role: message.role.to_string(),
        content: message.content.clone(),
    }
}

pub(super) fn to_wire(envelope: &RequestEnvelope, model: &str) -> ChatRequest {
    ChatRequest {
        model: model.to_string(),
        messages: envelope.messages.iter().map(convert_message).collect(),
        temperature: envelope.temperature,
        max_tokens: envelope.max_tokens,
        stream: false,
    }
}

pub(super) fn from_wire(response: ChatResponse) -> Result<ResponseEnvelope, LlmError> {
    let choice = response
        .choices
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("response has no choices".to_string()))?;

    let finish_reason = match choice.finish_reason.as_deref() {
        Some("content_filter") => {
            return Err(LlmError::ContentBlocked {
                reason: "content_filter".to_string(),
            });
        }
        Some("stop") | None => FinishReason::Stop,
        Some("length") => FinishReason::Length,
        Some(other) => FinishReason::Other(other.to_string()),
    };

    let content = choice.message.content.ok_or_else(|| {
        LlmError::MalformedResponse("choice message has no content".to_string())
    })?;

    let usage = response
        .usage
        .map(|u| Usage {
            prompt_tokens: u.prompt_tokens,
            completion_tokens: u.completion_tokens,
            total_tokens: u
                .total_tokens
                .unwrap_or(u.prompt_tokens + u.completion_tokens),
        })
        .unwrap_or_default();

    let mut envelope = ResponseEnvelope::new(content, finish_reason, usage);
    if let Some(model) = response.model {
        envelope.model = model;
    }
    Ok(envelope)
}
