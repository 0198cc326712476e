pub mod handlers;
pub mod models;
pub mod routes;

use crate::assistant::AssistantClient;
use crate::completion::CompletionClient;
use crate::config::{AssistantServerConfig, ChatServerConfig};

/// Shared state for the stateless chat variant.
pub struct ChatAppState {
    pub config: ChatServerConfig,
    pub client: CompletionClient,
}

/// Shared state for the thread-based assistant variant.
pub struct AssistantAppState {
    pub config: AssistantServerConfig,
    pub client: AssistantClient,
}
