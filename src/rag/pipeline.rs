//! Chat pipeline: Normalize -> Retrieve -> Select -> Compose -> Stream

use std::fmt;
use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingClient;
use crate::errors::ProfragError;
use crate::errors::Result;
use crate::llm::ChatCompletionClient;
use crate::llm::CompletionProvider;
use crate::llm::TokenStream;
use crate::models::ConversationMessage;
use crate::models::RetrievedMatch;
use crate::rag::MatchSelector;
use crate::rag::PromptBundle;
use crate::rag::PromptComposer;
use crate::rag::QueryNormalizer;
use crate::rag::RetrievalEngine;
use crate::rag::RetryPolicy;
use crate::rag::StreamPostProcessor;
use crate::vector::PineconeIndex;
use crate::vector::VectorIndex;

/// Where a chat request is in its lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatPhase {
    Received,
    Normalizing,
    Retrieving,
    Selecting,
    Composing,
    Streaming,
    Completed,
    Failed,
}

impl fmt::Display for ChatPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Received => "received",
            Self::Normalizing => "normalizing",
            Self::Retrieving => "retrieving",
            Self::Selecting => "selecting",
            Self::Composing => "composing",
            Self::Streaming => "streaming",
            Self::Completed => "completed",
            Self::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Everything decided before the model is called
#[derive(Debug, Clone)]
pub struct PreparedChat {
    pub search_key: String,
    pub selected: Option<RetrievedMatch>,
    pub prompt: PromptBundle,
}

/// Per-request coordinator for the chat endpoint
pub struct ChatOrchestrator {
    normalizer: QueryNormalizer,
    retriever: RetrievalEngine,
    selector: MatchSelector,
    composer: PromptComposer,
    completion: Arc<dyn CompletionProvider>,
}

impl ChatOrchestrator {
    /// Build the orchestrator against the configured providers
    ///
    /// # Errors
    /// - HTTP client construction failures
    /// - Missing vector index credentials
    pub fn new(config: &AppConfig) -> Result<Self> {
        let embedder = Arc::new(EmbeddingClient::from_config(config)?);
        let index = Arc::new(PineconeIndex::from_config(config)?);
        let completion = Arc::new(ChatCompletionClient::from_config(config)?);
        Ok(Self::from_services(config, embedder, index, completion))
    }

    /// Create from existing providers, taking retrieval settings from `config`
    pub fn from_services(
        config: &AppConfig,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        completion: Arc<dyn CompletionProvider>,
    ) -> Self {
        let retriever = RetrievalEngine::new(embedder, index)
            .with_top_k(config.retrieval.top_k)
            .with_namespace(config.query_namespace().map(str::to_string))
            .with_policy(RetryPolicy::from_config(&config.retrieval));

        Self {
            normalizer: QueryNormalizer::new(),
            retriever,
            selector: MatchSelector::new(config.retrieval.fallback_limit),
            composer: PromptComposer::default(),
            completion,
        }
    }

    /// Run every step up to, but not including, the completion call.
    ///
    /// # Errors
    /// - [`ProfragError::MalformedRequest`] for an empty conversation or an
    ///   empty final message
    /// - [`ProfragError::EmptyQuery`] when the final message is only whitespace;
    ///   no embedding call is made
    pub async fn prepare(&self, conversation: &[ConversationMessage]) -> Result<PreparedChat> {
        debug!(phase = %ChatPhase::Received, messages = conversation.len());

        let Some((last, prior)) = conversation.split_last() else {
            return Err(failed(
                ChatPhase::Received,
                ProfragError::MalformedRequest("conversation is empty".to_string()),
            ));
        };
        if last.content.is_empty() {
            return Err(failed(
                ChatPhase::Received,
                ProfragError::MalformedRequest("last message has no content".to_string()),
            ));
        }

        debug!(phase = %ChatPhase::Normalizing);
        let search_key = self
            .normalizer
            .normalize(&last.content)
            .map_err(|e| failed(ChatPhase::Normalizing, e))?;

        debug!(phase = %ChatPhase::Retrieving, search_key = %search_key);
        let matches = self.retriever.retrieve(&search_key).await;

        debug!(phase = %ChatPhase::Selecting, candidates = matches.len());
        let selected = self.selector.select(matches, &search_key).into_iter().next();

        debug!(phase = %ChatPhase::Composing);
        let prompt = self
            .composer
            .compose(prior, last, selected.as_ref(), &search_key);

        Ok(PreparedChat {
            search_key,
            selected,
            prompt,
        })
    }

    /// Answer `conversation` as a stream of raw, gated fragments.
    ///
    /// An error is returned only when nothing has been generated yet; later
    /// faults arrive as the final stream item. Cancelling `cancel` ends the
    /// stream and releases the provider connection.
    pub async fn chat(
        &self,
        conversation: &[ConversationMessage],
        cancel: CancellationToken,
    ) -> Result<TokenStream> {
        let prepared = self.prepare(conversation).await?;

        debug!(phase = %ChatPhase::Streaming);
        let response = self
            .completion
            .complete_stream(prepared.prompt.messages())
            .await
            .map_err(|e| failed(ChatPhase::Streaming, e))?;

        info!(
            search_key = %prepared.search_key,
            matched = prepared.selected.is_some(),
            "Streaming chat response"
        );
        Ok(StreamPostProcessor::new().into_stream(response.into_stream(), cancel))
    }
}

fn failed(phase: ChatPhase, error: ProfragError) -> ProfragError {
    warn!(phase = %phase, next = %ChatPhase::Failed, error = %error, "Chat request rejected");
    error
}
