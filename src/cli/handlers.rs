//! CLI command handlers

use std::io::Write;
use std::path::Path;
use std::sync::Arc;

use futures::StreamExt;
use tokio_util::sync::CancellationToken;
use tracing::info;
use tracing::warn;

use crate::cli::output::print_config;
use crate::cli::output::print_info;
use crate::cli::output::print_seed_report;
use crate::cli::output::print_success;
use crate::embeddings::EmbeddingClient;
use crate::ingest::IngestionService;
use crate::ingest::SeedLoader;
use crate::models::ConversationMessage;
use crate::rag::ChatOrchestrator;
use crate::vector::PineconeIndex;
use crate::AppConfig;
use crate::Result;

/// Run the API server, with command-line overrides on top of `[server]`
pub async fn handle_serve(
    config: &AppConfig,
    host: Option<String>,
    port: Option<u16>,
    no_cors: bool,
) -> Result<()> {
    config.validate()?;

    let host = host.unwrap_or_else(|| config.server.host.clone());
    let port = port.unwrap_or(config.server.port);
    let cors = config.server.enable_cors && !no_cors;

    println!("🚀 Starting profrag API Server");
    println!("===============================\n");
    println!("📍 Host: {host}");
    println!("🔌 Port: {port}");
    println!("🌐 CORS: {}", if cors { "Enabled" } else { "Disabled" });
    println!();

    crate::api::serve_api(config, host, port, cors).await
}

/// Answer a single question, streaming to stdout. Ctrl-C stops generation.
pub async fn handle_ask(config: &AppConfig, question: String) -> Result<()> {
    config.validate()?;
    let orchestrator = ChatOrchestrator::new(config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    let conversation = vec![ConversationMessage::user(question)];
    let mut stream = orchestrator.chat(&conversation, cancel.clone()).await?;

    let mut stdout = std::io::stdout();
    while let Some(fragment) = stream.next().await {
        stdout.write_all(fragment?.as_bytes())?;
        stdout.flush()?;
    }
    println!();

    if cancel.is_cancelled() {
        warn!("Answer interrupted");
    }
    Ok(())
}

/// Scrape one review page into the ingest namespace
pub async fn handle_ingest(config: &AppConfig, link: &str) -> Result<()> {
    config.validate()?;
    let service = IngestionService::new(config)?;

    print_info(&format!("Scraping {link}"));
    let inserted = service.ingest_link(link).await?;
    print_success(&format!(
        "Professor data scraped and inserted successfully ({inserted} reviews)"
    ));
    Ok(())
}

/// Load a reviews JSON file into the ingest namespace
pub async fn handle_seed(config: &AppConfig, file: &Path) -> Result<()> {
    config.validate()?;
    let loader = SeedLoader::new(
        Arc::new(EmbeddingClient::from_config(config)?),
        Arc::new(PineconeIndex::from_config(config)?),
        config.vector_index.ingest_namespace.clone(),
    );

    info!("Seeding from {}", file.display());
    let report = loader.load_file(file).await?;
    print_seed_report(&report);
    Ok(())
}

pub fn handle_config(config: &AppConfig) -> Result<()> {
    print_config(config);
    if let Err(e) = config.validate() {
        warn!("Configuration is not ready to serve requests: {}", e);
    }
    Ok(())
}
