//! API route definitions

use axum::routing::get;
use axum::routing::post;
use axum::Router;

use super::handlers::AppState;
use super::handlers::{
    self,
};

/// Create RESTful API router
pub fn api_routes(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/health", get(handlers::health))
        // Retrieval-augmented chat, streamed as plain text
        .route("/chat", post(handlers::chat))
        // Review page ingestion
        .route("/scrape", post(handlers::scrape))
        .with_state(state)
}
