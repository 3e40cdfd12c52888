//! Logging configuration for profrag

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::format::FmtSpan;
use tracing_subscriber::fmt::{
    self,
};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::Registry;

use crate::config::LoggingConfig;
use crate::Result;

const LOG_FILE_PREFIX: &str = "profrag.log";

/// Build the filter: `RUST_LOG` wins, otherwise the configured level.
fn env_filter(level: &str) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("{level},profrag={level},tower_http=info")))
}

/// Initialize logging with console and daily-rolling file output.
///
/// The returned guard flushes the file writer when dropped, so keep it alive
/// for the lifetime of the process.
pub fn init_logging(config: &LoggingConfig, verbose: bool) -> Result<WorkerGuard> {
    let logs_dir = Path::new(&config.log_dir);
    if !logs_dir.exists() {
        std::fs::create_dir_all(logs_dir)?;
    }

    if config.backtrace && std::env::var_os("RUST_BACKTRACE").is_none() {
        std::env::set_var("RUST_BACKTRACE", "1");
    }

    let level = if verbose { "debug" } else { config.level.as_str() };

    let file_appender = tracing_appender::rolling::daily(logs_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);

    let console_layer = fmt::layer()
        .with_target(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(std::io::stderr);

    let file_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_thread_names(true)
        .with_file(true)
        .with_line_number(true)
        .with_span_events(FmtSpan::CLOSE)
        .with_writer(non_blocking)
        .with_ansi(false); // No colors in file

    Registry::default()
        .with(env_filter(level))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| crate::ProfragError::Custom(format!("Failed to initialize logging: {e}")))?;

    tracing::info!("Logging initialized with level: {}", level);
    tracing::info!(
        "Log files will be saved to: {}/{}.YYYY-MM-DD",
        config.log_dir,
        LOG_FILE_PREFIX
    );

    Ok(guard)
}

/// Initialize simple console logging for tests and one-shot commands
pub fn init_simple_logging() -> Result<()> {
    tracing_subscriber::fmt()
        .with_target(true)
        .with_env_filter(env_filter("info"))
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|e| crate::ProfragError::Custom(format!("Failed to initialize logging: {e}")))?;

    tracing::debug!("Simple logging initialized");
    Ok(())
}
