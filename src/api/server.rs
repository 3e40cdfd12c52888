//! HTTP server implementation

use std::sync::Arc;

use axum::Router;
use tokio_util::sync::CancellationToken;
use tower::ServiceBuilder;
use tower_http::compression::predicate::DefaultPredicate;
use tower_http::compression::predicate::NotForContentType;
use tower_http::compression::predicate::Predicate;
use tower_http::compression::CompressionLayer;
use tower_http::cors::Any;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing::warn;

use crate::api::handlers::AppState;
use crate::api::routes;
use crate::config::AppConfig;
use crate::ingest::IngestionService;
use crate::rag::ChatOrchestrator;
use crate::Result;

/// Assemble the application router with its middleware stack
pub fn build_router(state: AppState, enable_cors: bool) -> Router {
    // Compressing the chat body would hold fragments back until a block fills
    let compression = CompressionLayer::new().compress_when(
        DefaultPredicate::new().and(NotForContentType::const_new("text/plain")),
    );

    let mut app = Router::new()
        .nest("/api", routes::api_routes(state))
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(compression),
        );

    if enable_cors {
        info!("✅ CORS enabled");
        let cors = CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any);
        app = app.layer(cors);
    }

    app
}

/// Start the API server and run until Ctrl-C
pub async fn serve_api(
    config: &AppConfig,
    host: String,
    port: u16,
    enable_cors: bool,
) -> Result<()> {
    info!("🚀 Starting profrag API server...");

    // Initialize services
    let shutdown = CancellationToken::new();
    let state = AppState {
        chat: Arc::new(ChatOrchestrator::new(config)?),
        ingest: Arc::new(IngestionService::new(config)?),
        shutdown: shutdown.clone(),
    };

    let app = build_router(state, enable_cors);

    // Start server
    let addr = format!("{host}:{port}");
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    info!("🌐 API server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /api/health  - Health check");
    info!("  POST /api/chat    - Chat about professors (streamed)");
    info!("  POST /api/scrape  - Ingest a review page");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown))
        .await?;

    info!("Server stopped");
    Ok(())
}

/// Wait for Ctrl-C, then cancel every in-flight chat stream
async fn shutdown_signal(token: CancellationToken) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        warn!("Failed to listen for Ctrl-C, graceful shutdown disabled: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown requested, cancelling active streams");
    token.cancel();
}
