//! Generate-content wire format (`contents` in, `candidates` out)
//!
//! This family has no system role. System turns are folded into the first
//! user turn, and assistant turns are sent with the `model` role.

use serde::{Deserialize, Serialize};

use crate::types::{FinishReason, RequestEnvelope, ResponseEnvelope, Role, Usage};
use genforge_utils::error::LlmError;

/// Finish reasons that mean the provider withheld the output
const BLOCKED_FINISH_REASONS: &[&str] = &[
    "SAFETY",
    "RECITATION",
    "BLOCKLIST",
    "PROHIBITED_CONTENT",
    "SPII",
];

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    /// Carried in the URL path, not the body
    #[serde(skip)]
    pub model: String,
    pub contents: Vec<Content>,
    pub generation_config: GenerationSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSettings {
    pub temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_output_tokens: Option<u32>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub role: String,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

impl Content {
    fn text(role: &str, text: impl Into<String>) -> Self {
        Self {
            role: role.to_string(),
            parts: vec![Part { text: text.into() }],
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
    #[serde(default)]
    pub usage_metadata: Option<UsageMetadata>,
    #[serde(default)]
    pub prompt_feedback: Option<PromptFeedback>,
    #[serde(default)]
    pub model_version: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
    #[serde(default)]
    pub finish_reason: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UsageMetadata {
    #[serde(default)]
    pub prompt_token_count: u64,
    #[serde(default)]
    pub candidates_token_count: u64,
    #[serde(default)]
    pub total_token_count: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PromptFeedback {
    #[serde(default)]
    pub block_reason: Option<String>,
}

pub(super) fn to_wire(envelope: &RequestEnvelope, model: &str) -> GenerateRequest {
    let system: Vec<&str> = envelope
        .messages
        .iter()
        .filter(|m| m.role == Role::System)
        .map(|m| m.content.as_str())
        .collect();

    let mut contents: Vec<Content> = envelope
        .messages
        .iter()
        .filter(|m| m.role != Role::System)
        .map(|m| match m.role {
            Role::Assistant => Content::text("model", m.content.clone()),
            _ => Content::text("user", m.content.clone()),
        })
        .collect();

    if !system.is_empty() {
        let preamble = system.join("\n\n");
        match contents.iter_mut().find(|c| c.role == "user") {
            Some(first_user) => {
                if let Some(part) = first_user.parts.first_mut() {
                    part.text = format!("{preamble}\n\n{}", part.text);
                }
            }
            None => contents.insert(0, Content::text("user", preamble)),
        }
    }

    GenerateRequest {
        model: model.to_string(),
        contents,
        generation_config: GenerationSettings {
            temperature: envelope.temperature,
            max_output_tokens: envelope.max_tokens,
        },
    }
}

pub(super) fn from_wire(response: GenerateResponse) -> Result<ResponseEnvelope, LlmError> {
    if let Some(reason) = response
        .prompt_feedback
        .as_ref()
        .and_then(|f| f.block_reason.clone())
    {
        return Err(LlmError::ContentBlocked { reason });
    }

    let candidate = response
        .candidates
        .into_iter()
        .next()
        .ok_or_else(|| LlmError::MalformedResponse("response has no candidates".to_string()))?;

    let finish_reason = match candidate.finish_reason.as_deref() {
        Some(reason) if BLOCKED_FINISH_REASONS.contains(&reason) => {
            return Err(LlmError::ContentBlocked {
                reason: reason.to_string(),
            });
        }
        Some("STOP") | None => FinishReason::Stop,
        Some("MAX_TOKENS") => FinishReason::Length,
        Some(other) => FinishReason::Other(other.to_ascii_lowercase()),
    };

    let content = candidate
        .content
        .ok_or_else(|| LlmError::MalformedResponse("candidate has no content".to_string()))?
        .parts
        .into_iter()
        .map(|p| p.text)
        .collect::<String>();

    let usage = response
        .usage_metadata
        .map(|u| Usage {
            prompt_tokens: u.prompt_token_count,
            completion_tokens: u.candidates_token_count,
            total_tokens: u
                .total_token_count
                .unwrap_or(u.prompt_token_count + u.candidates_token_count),
        })
        .unwrap_or_default();

    let mut envelope = ResponseEnvelope::new(content, finish_reason, usage);
    if let Some(model) = response.model_version {
        envelope.model = model;
    }
    Ok(envelope)
}
