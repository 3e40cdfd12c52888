pub mod api;
pub mod cli;
pub mod config;
pub mod embeddings;
pub mod errors;
pub mod ingest;
pub mod llm;
pub mod logging;
pub mod models;
pub mod rag;
pub mod vector;

#[cfg(test)]
pub mod tests;

pub use config::AppConfig;
pub use errors::*;
