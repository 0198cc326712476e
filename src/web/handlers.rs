use actix_web::{web, HttpResponse};
use chrono::Utc;
use log::info;
use serde_json::json;

use crate::error::RelayError;
use crate::web::models::{
    AssistantChatResponse, ChatCompletionResponse, ChatRequest, NewThreadResponse,
};
use crate::web::{AssistantAppState, ChatAppState};

// Health check endpoint
pub async fn chat_health() -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "message": "Chat relay is running",
        "timestamp": Utc::now().to_rfc3339(),
    }))
}

// Health check endpoint; also reports whether an assistant id is configured
// so the frontend can surface setup problems early.
pub async fn assistant_health(data: web::Data<AssistantAppState>) -> HttpResponse {
    HttpResponse::Ok().json(json!({
        "status": "ok",
        "message": "Assistant relay is running",
        "timestamp": Utc::now().to_rfc3339(),
        "assistantConfigured": data.config.assistant_id.is_some(),
    }))
}

/// Stateless chat: replay the supplied history against the completion
/// endpoint and return the generated reply.
pub async fn chat(
    data: web::Data<ChatAppState>,
    req: web::Json<ChatRequest>,
) -> Result<HttpResponse, RelayError> {
    let message = req.message_text()?;

    info!(
        "Chat request of {} characters with {} history entries",
        message.len(),
        req.conversation_history.len()
    );

    let outcome = data
        .client
        .complete(message, &req.conversation_history)
        .await?;

    Ok(HttpResponse::Ok().json(ChatCompletionResponse {
        response: outcome.response,
        model: outcome.model,
        usage: outcome.usage,
    }))
}

/// Thread-based chat: create or reuse a thread, run the assistant on it, and
/// poll the run to completion.
pub async fn assistant_chat(
    data: web::Data<AssistantAppState>,
    req: web::Json<ChatRequest>,
) -> Result<HttpResponse, RelayError> {
    let message = req.message_text()?;

    // Checked before any upstream traffic so a misconfigured server fails
    // fast instead of leaving an orphaned thread and message behind.
    if data.config.assistant_id.is_none() {
        return Err(RelayError::Configuration(
            "Assistant ID not configured".to_string(),
        ));
    }

    info!(
        "Assistant chat request of {} characters (thread: {})",
        message.len(),
        req.thread_id.as_deref().unwrap_or("new")
    );

    let outcome = data.client.complete(message, req.thread_id.as_deref()).await?;

    Ok(HttpResponse::Ok().json(AssistantChatResponse {
        response: outcome.response,
        thread_id: outcome.thread_id,
        run_id: outcome.run_id,
    }))
}

/// Explicit conversation reset: mint a fresh thread, exchange no messages.
pub async fn new_thread(
    data: web::Data<AssistantAppState>,
) -> Result<HttpResponse, RelayError> {
    let thread_id = data.client.create_thread().await?;
    info!("Created thread {thread_id} for a context reset");
    Ok(HttpResponse::Ok().json(NewThreadResponse { thread_id }))
}
