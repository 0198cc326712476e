//! Stateless upstream client: one synchronous round trip against the
//! chat-completion endpoint, replaying whatever history the caller supplied.

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::ChatServerConfig;
use crate::error::RelayError;
use crate::web::models::{HistoryEntry, Role};

const SYSTEM_PROMPT: &str =
    "You are a helpful assistant. Answer clearly and concisely.";

// Generation parameters the relay pins rather than exposing to callers.
const TOP_P: f32 = 1.0;
const FREQUENCY_PENALTY: f32 = 0.0;
const PRESENCE_PENALTY: f32 = 0.0;

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: Vec<ApiMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    top_p: f32,
    frequency_penalty: f32,
    presence_penalty: f32,
}

#[derive(Serialize)]
struct ApiMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct CompletionResponse {
    model: String,
    choices: Vec<Choice>,
    usage: Usage,
}

#[derive(Deserialize)]
struct Choice {
    message: ChoiceMessage,
}

#[derive(Deserialize)]
struct ChoiceMessage {
    content: String,
}

/// Token accounting as reported by upstream, passed through to the caller.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
    pub total_tokens: u32,
}

/// Result of one completion round trip.
pub struct CompletionOutcome {
    pub response: String,
    pub model: String,
    pub usage: Usage,
}

/// Client for the upstream chat-completion endpoint.
pub struct CompletionClient {
    client: reqwest::Client,
    url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

impl CompletionClient {
    pub fn new(config: &ChatServerConfig) -> Self {
        let base = config.base_url.trim_end_matches('/');
        Self {
            client: reqwest::Client::new(),
            url: format!("{base}/chat/completions"),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
        }
    }

    /// One completion round trip: system prompt, then the caller's history
    /// verbatim, then the new user message. No retries; the first upstream
    /// failure is surfaced to the gateway as-is.
    pub async fn complete(
        &self,
        message: &str,
        history: &[HistoryEntry],
    ) -> Result<CompletionOutcome, RelayError> {
        let mut messages = Vec::with_capacity(history.len() + 2);
        messages.push(ApiMessage {
            role: Role::System.as_str(),
            content: SYSTEM_PROMPT,
        });
        for entry in history {
            // Roles are relayed as received; upstream is the validator here.
            messages.push(ApiMessage {
                role: &entry.role,
                content: &entry.content,
            });
        }
        messages.push(ApiMessage {
            role: Role::User.as_str(),
            content: message,
        });

        let payload = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            top_p: TOP_P,
            frequency_penalty: FREQUENCY_PENALTY,
            presence_penalty: PRESENCE_PENALTY,
        };

        debug!("Requesting completion from {}", self.url);
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.ok();
            return Err(RelayError::from_upstream(status.as_u16(), body.as_deref()));
        }

        let parsed: CompletionResponse =
            response.json().await.map_err(|e| RelayError::Upstream {
                status: None,
                message: format!("unexpected completion response shape: {e}"),
            })?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| RelayError::Upstream {
                status: None,
                message: "completion response contained no choices".to_string(),
            })?;

        info!(
            "Completion of {} characters from model {}",
            choice.message.content.len(),
            parsed.model
        );

        Ok(CompletionOutcome {
            response: choice.message.content,
            model: parsed.model,
            usage: parsed.usage,
        })
    }
}
