//! Embeddings generation module
//!
//! Text is turned into fixed-length vectors through the [`Embedder`] trait.
//! [`EmbeddingClient`] implements it against:
//! - OpenAI (text-embedding-ada-002, text-embedding-3-small, etc.)
//! - Ollama (local models)
//!
//! # Examples
//!
//! ```rust,no_run
//! use profrag::config::AppConfig;
//! use profrag::embeddings::{Embedder, EmbeddingClient};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let client = EmbeddingClient::from_config(&config)?;
//!
//!     let embedding = client.embed("Dr. Jane Smith").await?;
//!     println!("Generated embedding with {} dimensions", embedding.len());
//!
//!     Ok(())
//! }
//! ```

pub mod client;

use async_trait::async_trait;
pub use client::EmbeddingClient;

use crate::errors::Result;

/// Default embedding dimension for OpenAI text-embedding-ada-002
pub const DEFAULT_EMBEDDING_DIM: usize = 1536;

/// Turns text into an embedding vector.
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;
}
