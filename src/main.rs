use anyhow::Context;
use clap::Parser;
use profrag::cli::handle_ask;
use profrag::cli::handle_config;
use profrag::cli::handle_ingest;
use profrag::cli::handle_seed;
use profrag::cli::handle_serve;
use profrag::cli::print_error;
use profrag::cli::Cli;
use profrag::cli::Commands;
use profrag::config::AppConfig;
use profrag::logging::init_logging;
use tracing::info;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Secrets may live in .env; a missing file is fine
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    // Load configuration
    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .with_context(|| format!("failed to load {}", path.display()))?,
        None => AppConfig::load().context("failed to load configuration")?,
    };

    // Initialize logging
    let _log_guard = init_logging(&config.logging, cli.verbose)?;
    info!("Configuration loaded successfully");

    // Execute the requested command
    let result = match cli.command {
        Commands::Serve {
            host,
            port,
            no_cors,
        } => handle_serve(&config, host, port, no_cors).await,
        Commands::Ask { question } => handle_ask(&config, question).await,
        Commands::Ingest { link } => handle_ingest(&config, &link).await,
        Commands::Seed { file } => handle_seed(&config, &file).await,
        Commands::Config => handle_config(&config),
    };

    if let Err(e) = &result {
        print_error(&e.to_string());
    }
    Ok(result?)
}
