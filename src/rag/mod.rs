//! RAG (Retrieval-Augmented Generation) module
//!
//! This module answers chat requests about professors:
//! - Search-key extraction from the last user message
//! - Embedding + vector search with bounded retry
//! - Candidate filtering against the search key
//! - Prompt assembly with the retrieved review as context
//! - Gated streaming of the model's answer
//!
//! # Examples
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use profrag::config::AppConfig;
//! use profrag::models::ConversationMessage;
//! use profrag::rag::ChatOrchestrator;
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::load()?;
//!     let orchestrator = ChatOrchestrator::new(&config)?;
//!
//!     let conversation = vec![ConversationMessage::user("Tell me about Dr. Jane Smith")];
//!     let mut stream = orchestrator.chat(&conversation, CancellationToken::new()).await?;
//!     while let Some(fragment) = stream.next().await {
//!         print!("{}", fragment?);
//!     }
//!
//!     Ok(())
//! }
//! ```

pub mod pipeline;
pub mod postprocess;
pub mod prompts;
pub mod query;
pub mod retriever;
pub mod selector;

pub use pipeline::ChatOrchestrator;
pub use pipeline::ChatPhase;
pub use pipeline::PreparedChat;
pub use postprocess::clean_response;
pub use postprocess::StreamPostProcessor;
pub use prompts::PromptBundle;
pub use prompts::PromptComposer;
pub use prompts::SYSTEM_PROMPT;
pub use query::QueryNormalizer;
pub use retriever::RetrievalEngine;
pub use retriever::RetryPolicy;
pub use selector::MatchSelector;
