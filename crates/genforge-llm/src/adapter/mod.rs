//! Translation between envelopes and backend wire formats

pub mod chat;
pub mod generate;

use crate::types::{RequestEnvelope, ResponseEnvelope};
use genforge_config::BackendFamily;
use genforge_utils::error::LlmError;

pub use chat::{ChatRequest, ChatResponse};
pub use generate::{GenerateRequest, GenerateResponse};

/// Warning attached to responses that stopped at the token limit
pub const TRUNCATION_WARNING: &str = "response stopped at the token limit and may be truncated";

/// Request body for one backend family
#[derive(Debug, Clone, PartialEq)]
pub enum WireRequest {
    Chat(ChatRequest),
    Generate(GenerateRequest),
}

impl WireRequest {
    #[must_use]
    pub fn family(&self) -> BackendFamily {
        match self {
            Self::Chat(_) => BackendFamily::Chat,
            Self::Generate(_) => BackendFamily::Generate,
        }
    }

    #[must_use]
    pub fn model(&self) -> &str {
        match self {
            Self::Chat(request) => &request.model,
            Self::Generate(request) => &request.model,
        }
    }

    /// Text of the final user turn as sent on the wire.
    #[must_use]
    pub fn last_user_text(&self) -> Option<String> {
        match self {
            Self::Chat(request) => request
                .messages
                .iter()
                .rev()
                .find(|m| m.role == "user")
                .map(|m| m.content.clone()),
            Self::Generate(request) => request
                .contents
                .iter()
                .rev()
                .find(|c| c.role == "user")
                .map(|c| c.parts.iter().map(|p| p.text.as_str()).collect()),
        }
    }
}

/// Parsed response body for one backend family
#[derive(Debug, Clone, PartialEq)]
pub enum WireResponse {
    Chat(ChatResponse),
    Generate(GenerateResponse),
}

/// Decode a response body as `family`'s format. The family is never guessed
/// from the body's shape.
///
/// # Errors
///
/// `MalformedResponse` when the body is not valid JSON for that format.
pub fn decode_response(family: BackendFamily, body: &[u8]) -> Result<WireResponse, LlmError> {
    let decoded = match family {
        BackendFamily::Chat => serde_json::from_slice(body).map(WireResponse::Chat),
        BackendFamily::Generate => serde_json::from_slice(body).map(WireResponse::Generate),
    };
    decoded.map_err(|e| LlmError::MalformedResponse(format!("unparseable {family} body: {e}")))
}

/// Build the wire request for `family` from a provider-neutral envelope.
#[must_use]
pub fn to_wire(family: BackendFamily, envelope: &RequestEnvelope, model: &str) -> WireRequest {
    match family {
        BackendFamily::Chat => WireRequest::Chat(chat::to_wire(envelope, model)),
        BackendFamily::Generate => WireRequest::Generate(generate::to_wire(envelope, model)),
    }
}

/// Translate a wire response into a [`ResponseEnvelope`].
///
/// # Errors
///
/// `ContentBlocked` when the provider withheld the output, `MalformedResponse`
/// when the body carries no usable content.
pub fn from_wire(response: WireResponse) -> Result<ResponseEnvelope, LlmError> {
    let mut envelope = match response {
        WireResponse::Chat(response) => chat::from_wire(response)?,
        WireResponse::Generate(response) => generate::from_wire(response)?,
    };
    if envelope.is_truncated() {
        envelope.warnings.push(TRUNCATION_WARNING.to_string());
    }
    Ok(envelope)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Message;

    #[test]
    fn test_to_wire_picks_family() {
        let envelope = RequestEnvelope::new(vec![Message::user("make index.html")]);

        let chat = to_wire(BackendFamily::Chat, &envelope, "gpt-4o-mini");
        assert_eq!(chat.family(), BackendFamily::Chat);
        assert_eq!(chat.model(), "gpt-4o-mini");
        assert_eq!(chat.last_user_text().as_deref(), Some("make index.html"));

        let generate = to_wire(BackendFamily::Generate, &envelope, "gemini-1.5-flash");
        assert_eq!(generate.family(), BackendFamily::Generate);
        assert_eq!(generate.last_user_text().as_deref(), Some("make index.html"));
    }

    #[test]
    fn test_decode_follows_family_not_shape() {
        let body = br#"{"candidates": [{"content": {"role": "model", "parts": [{"text": "hi"}]}, "finishReason": "STOP"}]}"#;

        let generate = decode_response(BackendFamily::Generate, body).unwrap();
        assert!(matches!(generate, WireResponse::Generate(_)));
        assert_eq!(from_wire(generate).unwrap().content, "hi");

        // a generate-shaped body on a chat backend is not silently reinterpreted
        let chat = decode_response(BackendFamily::Chat, body).unwrap();
        assert!(matches!(chat, WireResponse::Chat(_)));
        assert!(matches!(from_wire(chat), Err(LlmError::MalformedResponse(_))));

        assert!(matches!(
            decode_response(BackendFamily::Chat, b"not json"),
            Err(LlmError::MalformedResponse(_))
        ));
    }

    #[test]
    fn test_truncation_adds_warning() {
        let response: ChatResponse = serde_json::from_str(
            r#"{"choices": [{"message": {"content": "x"}, "finish_reason": "length"}]}"#,
        )
        .unwrap();
        let envelope = from_wire(WireResponse::Chat(response)).unwrap();
        assert_eq!(envelope.warnings, vec![TRUNCATION_WARNING.to_string()]);
    }
}
