use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::completion::Usage;
use crate::error::RelayError;

/// Inbound chat body, shared by both variants (each reads its own optional
/// field). `message` stays a raw JSON value so the gateway can reject
/// non-string input with a 400 instead of a deserialization fault.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatRequest {
    #[serde(default)]
    pub message: Option<Value>,
    #[serde(default)]
    pub conversation_history: Vec<HistoryEntry>,
    #[serde(default)]
    pub thread_id: Option<String>,
}

impl ChatRequest {
    /// The validated message text, or the 400-class error the chat route
    /// promises for absent, empty, or non-string input.
    pub fn message_text(&self) -> Result<&str, RelayError> {
        match self.message.as_ref().and_then(Value::as_str) {
            Some(text) if !text.is_empty() => Ok(text),
            _ => Err(RelayError::Validation(
                "Message is required and must be a string".to_string(),
            )),
        }
    }
}

/// One prior conversation turn, relayed upstream verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}

/// Roles the relay itself authors. History entries keep whatever role the
/// caller sent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// Stateless chat reply: generated text plus upstream accounting.
#[derive(Debug, Serialize)]
pub struct ChatCompletionResponse {
    pub response: String,
    pub model: String,
    pub usage: Usage,
}

/// Assistant chat reply: generated text plus the handles the caller needs
/// to continue (thread) and to debug (run).
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssistantChatResponse {
    pub response: String,
    pub thread_id: String,
    pub run_id: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewThreadResponse {
    pub thread_id: String,
}
