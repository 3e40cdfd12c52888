//! CLI output formatting utilities

use crate::ingest::SeedReport;
use crate::AppConfig;

fn or_unset(value: Option<&str>) -> &str {
    value.unwrap_or("(not set)")
}

/// Print the effective configuration with secrets masked
pub fn print_config(config: &AppConfig) {
    let config = config.redacted();
    println!("📋 profrag Configuration:");
    println!();

    println!("🌐 Server:");
    println!("  Bind address: {}", config.bind_address());
    println!("  CORS: {}", config.server.enable_cors);
    println!();

    println!("📝 Logging:");
    println!("  Level: {}", config.logging.level);
    println!("  Backtrace: {}", config.logging.backtrace);
    println!("  Directory: {}", config.logging.log_dir);
    println!();

    println!("🧠 Embeddings:");
    println!("  Provider: {:?}", config.embeddings.provider);
    println!("  Endpoint: {}", config.embeddings.endpoint);
    println!("  Model: {}", config.embedding_model());
    println!("  Dimension: {}", config.embedding_dimension());
    println!("  API key: {}", or_unset(config.embeddings.api_key.as_deref()));
    println!();

    println!("🤖 LLM:");
    println!("  Endpoint: {}", config.llm_endpoint());
    println!("  Model: {}", config.llm_model());
    println!("  API key: {}", or_unset(config.llm.llm_key.as_deref()));
    if let Some(temperature) = config.llm.temperature {
        println!("  Temperature: {temperature}");
    }
    println!();

    println!("📦 Vector index:");
    println!("  Host: {}", config.vector_index.host);
    println!("  API key: {}", or_unset(config.vector_index.api_key.as_deref()));
    println!(
        "  Query namespace: {}",
        config.query_namespace().unwrap_or("(default)")
    );
    println!("  Ingest namespace: {}", config.vector_index.ingest_namespace);
    println!();

    println!("🔁 Retrieval:");
    println!("  Top K: {}", config.retrieval.top_k);
    println!("  Max attempts: {}", config.retrieval.max_attempts);
    println!(
        "  Retry delay: {}ms ({:?})",
        config.retrieval.retry_delay_ms, config.retrieval.backoff
    );
    println!("  Fallback limit: {}", config.retrieval.fallback_limit);
}

pub fn print_seed_report(report: &SeedReport) {
    for (number, upserted) in report.batches.iter().enumerate() {
        println!("  Batch {} upserted count: {}", number + 1, upserted);
    }
    print_success(&format!(
        "Embedded {} reviews, upserted {}",
        report.embedded,
        report.upserted()
    ));
}

pub fn print_info(msg: &str) {
    println!("ℹ️  {msg}");
}

pub fn print_success(msg: &str) {
    println!("✅ {msg}");
}

pub fn print_error(msg: &str) {
    eprintln!("❌ {msg}");
}
