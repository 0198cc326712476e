//! Stateful upstream client: thread management, asynchronous runs, and the
//! status poll that bridges the two.
//!
//! Conversation state lives entirely upstream. The caller owns the thread id
//! across requests; each turn appends a message, starts a run against the
//! configured assistant, polls the run to a terminal state, then reads back
//! the newest assistant message.

use std::sync::Arc;
use std::time::Duration;

use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::config::AssistantServerConfig;
use crate::error::RelayError;
use crate::poll::{poll_until, PollError, PollPolicy, Sleeper, TokioSleeper};
use crate::web::models::Role;

// Every assistants endpoint requires the feature-version header next to the
// bearer token.
const BETA_HEADER: &str = "OpenAI-Beta";
const BETA_VERSION: &str = "assistants=v2";

const POLL_MAX_ATTEMPTS: u32 = 60;
const POLL_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Deserialize)]
struct ThreadObject {
    id: String,
}

#[derive(Deserialize)]
struct RunObject {
    id: String,
    status: RunStatus,
    last_error: Option<RunLastError>,
}

#[derive(Deserialize)]
struct RunLastError {
    message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
enum RunStatus {
    Queued,
    InProgress,
    Completed,
    Failed,
    Cancelled,
    Expired,
    /// Anything else (`requires_action`, future additions): neither done nor
    /// dead, so the poll loop keeps waiting on it.
    #[serde(other)]
    Other,
}

impl RunStatus {
    fn is_failure(self) -> bool {
        matches!(
            self,
            RunStatus::Failed | RunStatus::Cancelled | RunStatus::Expired
        )
    }

    fn label(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::Completed => "completed",
            RunStatus::Failed => "failed",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Expired => "expired",
            RunStatus::Other => "unknown",
        }
    }
}

#[derive(Deserialize)]
struct MessageList {
    data: Vec<ThreadMessage>,
}

#[derive(Deserialize)]
struct ThreadMessage {
    role: String,
    content: Vec<ContentPart>,
}

#[derive(Deserialize)]
#[serde(tag = "type")]
enum ContentPart {
    #[serde(rename = "text")]
    Text { text: TextContent },
    /// Image or other non-text parts; skipped when assembling the reply.
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct TextContent {
    value: String,
}

#[derive(Serialize)]
struct CreateMessageRequest<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct CreateRunRequest<'a> {
    assistant_id: &'a str,
}

/// Result of one assistant turn. The thread id goes back to the caller so the
/// conversation can continue; the run id is diagnostic only.
pub struct AssistantOutcome {
    pub response: String,
    pub thread_id: String,
    pub run_id: String,
}

/// Client for the upstream thread/message/run endpoints.
pub struct AssistantClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    assistant_id: Option<String>,
    policy: PollPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl AssistantClient {
    pub fn new(config: &AssistantServerConfig) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            assistant_id: config.assistant_id.clone(),
            policy: PollPolicy {
                max_attempts: POLL_MAX_ATTEMPTS,
                interval: POLL_INTERVAL,
            },
            sleeper: Arc::new(TokioSleeper),
        }
    }

    /// Replace the poll sleeper; tests use this to run the loop without real
    /// delays.
    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    /// One assistant turn against an existing or freshly created thread.
    pub async fn complete(
        &self,
        message: &str,
        thread_id: Option<&str>,
    ) -> Result<AssistantOutcome, RelayError> {
        // A supplied thread id is trusted as-is; only its absence costs a
        // create call.
        let thread_id = match thread_id {
            Some(id) => id.to_string(),
            None => {
                let thread = self.create_thread_object().await?;
                info!("Created thread {}", thread.id);
                thread.id
            }
        };

        self.append_message(&thread_id, message).await?;

        let run = self.start_run(&thread_id).await?;
        info!("Started run {} on thread {}", run.id, thread_id);
        let run_id = run.id;

        let poll_result = poll_until(
            self.policy,
            self.sleeper.as_ref(),
            || self.fetch_run(&thread_id, &run_id),
            |run: &RunObject| run.status == RunStatus::Completed,
            |run: &RunObject| run.status.is_failure(),
        )
        .await;

        match poll_result {
            Ok(_) => {}
            Err(PollError::Fetch(e)) => return Err(e),
            Err(PollError::Rejected(run)) => {
                let message = match run.last_error {
                    Some(e) => e.message,
                    None => format!("run ended with status {}", run.status.label()),
                };
                return Err(RelayError::Upstream {
                    status: None,
                    message,
                });
            }
            Err(PollError::TimedOut) => {
                return Err(RelayError::Timeout {
                    attempts: self.policy.max_attempts,
                })
            }
        }

        let response = self.latest_assistant_text(&thread_id).await?;
        Ok(AssistantOutcome {
            response,
            thread_id,
            run_id,
        })
    }

    /// Mint a fresh thread with no message exchange; used by the context
    /// reset route.
    pub async fn create_thread(&self) -> Result<String, RelayError> {
        let thread = self.create_thread_object().await?;
        Ok(thread.id)
    }

    async fn create_thread_object(&self) -> Result<ThreadObject, RelayError> {
        let response = self
            .client
            .post(format!("{}/threads", self.base_url))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VERSION)
            .json(&serde_json::json!({}))
            .send()
            .await?;
        read_json(response).await
    }

    async fn append_message(&self, thread_id: &str, message: &str) -> Result<(), RelayError> {
        let response = self
            .client
            .post(format!("{}/threads/{thread_id}/messages", self.base_url))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VERSION)
            .json(&CreateMessageRequest {
                role: Role::User.as_str(),
                content: message,
            })
            .send()
            .await?;
        ensure_success(response).await
    }

    async fn start_run(&self, thread_id: &str) -> Result<RunObject, RelayError> {
        let assistant_id = self.assistant_id.as_deref().ok_or_else(|| {
            RelayError::Configuration("Assistant ID not configured".to_string())
        })?;
        let response = self
            .client
            .post(format!("{}/threads/{thread_id}/runs", self.base_url))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VERSION)
            .json(&CreateRunRequest { assistant_id })
            .send()
            .await?;
        read_json(response).await
    }

    async fn fetch_run(&self, thread_id: &str, run_id: &str) -> Result<RunObject, RelayError> {
        let response = self
            .client
            .get(format!("{}/threads/{thread_id}/runs/{run_id}", self.base_url))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VERSION)
            .send()
            .await?;
        let run: RunObject = read_json(response).await?;
        debug!("Run {} is {}", run.id, run.status.label());
        Ok(run)
    }

    /// Newest assistant message on the thread, text parts joined in order.
    /// Upstream lists messages newest first.
    async fn latest_assistant_text(&self, thread_id: &str) -> Result<String, RelayError> {
        let response = self
            .client
            .get(format!("{}/threads/{thread_id}/messages", self.base_url))
            .bearer_auth(&self.api_key)
            .header(BETA_HEADER, BETA_VERSION)
            .send()
            .await?;
        let list: MessageList = read_json(response).await?;

        let message = list
            .data
            .into_iter()
            .find(|m| m.role == Role::Assistant.as_str())
            .ok_or_else(|| RelayError::Upstream {
                status: None,
                message: "no assistant response found".to_string(),
            })?;

        let text = message
            .content
            .iter()
            .filter_map(|part| match part {
                ContentPart::Text { text } => Some(text.value.as_str()),
                ContentPart::Other => None,
            })
            .collect::<Vec<_>>()
            .join("\n");

        Ok(strip_citations(&text))
    }
}

/// Remove the `【...】` citation markers the model inlines when it references
/// source material. An unmatched opening bracket is left alone.
fn strip_citations(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('【') {
        match rest[start..].find('】') {
            Some(offset) => {
                cleaned.push_str(&rest[..start]);
                rest = &rest[start + offset + '】'.len_utf8()..];
            }
            None => break,
        }
    }
    cleaned.push_str(rest);
    cleaned
}

async fn ensure_success(response: reqwest::Response) -> Result<(), RelayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.ok();
        return Err(RelayError::from_upstream(status.as_u16(), body.as_deref()));
    }
    Ok(())
}

async fn read_json<T: serde::de::DeserializeOwned>(
    response: reqwest::Response,
) -> Result<T, RelayError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.ok();
        return Err(RelayError::from_upstream(status.as_u16(), body.as_deref()));
    }
    response.json().await.map_err(|e| RelayError::Upstream {
        status: None,
        message: format!("unexpected upstream response shape: {e}"),
    })
}
