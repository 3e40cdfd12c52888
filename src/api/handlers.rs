/// API request handlers
use std::sync::Arc;

use axum::body::Body;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::header;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::response::Response;
use axum::Json;
use tokio_util::sync::CancellationToken;
use tracing::error;
use tracing::info;

use crate::api::types::ApiResponse;
use crate::api::types::ErrorResponse;
use crate::api::types::HealthResponse;
use crate::api::types::ScrapeRequest;
use crate::api::types::ScrapeResponse;
use crate::api::types::CHAT_ERROR_MESSAGE;
use crate::api::types::SCRAPE_ERROR_MESSAGE;
use crate::api::types::SCRAPE_SUCCESS_MESSAGE;
use crate::errors::ProfragError;
use crate::ingest::IngestionService;
use crate::models::ConversationMessage;
use crate::rag::ChatOrchestrator;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub chat: Arc<ChatOrchestrator>,
    pub ingest: Arc<IngestionService>,
    /// Cancelled on server shutdown; each chat stream gets a child token
    pub shutdown: CancellationToken,
}

/// Health check handler
pub async fn health() -> Json<ApiResponse<HealthResponse>> {
    Json(ApiResponse::success(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    }))
}

/// Chat (POST /api/chat)
///
/// Takes the conversation as a JSON array of messages and streams the answer
/// as plain text.
pub async fn chat(State(state): State<AppState>, body: Bytes) -> Response {
    let conversation: Vec<ConversationMessage> = match serde_json::from_slice(&body) {
        Ok(conversation) => conversation,
        Err(e) => return chat_failure(&ProfragError::MalformedRequest(e.to_string())),
    };
    info!("POST /api/chat ({} messages)", conversation.len());

    match state
        .chat
        .chat(&conversation, state.shutdown.child_token())
        .await
    {
        Ok(stream) => (
            [(header::CONTENT_TYPE, "text/plain; charset=utf-8")],
            Body::from_stream(stream),
        )
            .into_response(),
        Err(e) => chat_failure(&e),
    }
}

fn chat_failure(error: &ProfragError) -> Response {
    error!("Chat request failed: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(CHAT_ERROR_MESSAGE)),
    )
        .into_response()
}

/// Scrape a review page into the index (POST /api/scrape)
pub async fn scrape(State(state): State<AppState>, body: Bytes) -> Response {
    let request: ScrapeRequest = match serde_json::from_slice(&body) {
        Ok(request) => request,
        Err(e) => return scrape_failure(&ProfragError::MalformedRequest(e.to_string())),
    };
    info!("POST /api/scrape: {}", request.link);

    match state.ingest.ingest_link(&request.link).await {
        Ok(inserted) => Json(ScrapeResponse {
            message: SCRAPE_SUCCESS_MESSAGE.to_string(),
            inserted,
        })
        .into_response(),
        Err(e) => scrape_failure(&e),
    }
}

fn scrape_failure(error: &ProfragError) -> Response {
    error!("Scrape request failed: {}", error);
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse::new(SCRAPE_ERROR_MESSAGE)),
    )
        .into_response()
}
