//! Embedding + vector search with bounded retry

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;
use tracing::info;
use tracing::warn;

use crate::config::BackoffKind;
use crate::config::RetrievalConfig;
use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::models::RetrievedMatch;
use crate::vector::VectorIndex;

/// How many times retrieval is attempted and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
    pub backoff: BackoffKind,
}

impl RetryPolicy {
    /// Retry immediately, up to `max_attempts` in total
    pub const fn immediate(max_attempts: u32) -> Self {
        Self {
            max_attempts,
            delay: Duration::ZERO,
            backoff: BackoffKind::None,
        }
    }

    #[must_use]
    pub fn with_backoff(mut self, delay: Duration, backoff: BackoffKind) -> Self {
        self.delay = delay;
        self.backoff = backoff;
        self
    }

    pub fn from_config(config: &RetrievalConfig) -> Self {
        Self::immediate(config.max_attempts).with_backoff(
            Duration::from_millis(config.retry_delay_ms),
            config.backoff,
        )
    }

    /// Wait before attempt number `attempt` (1-based); the first attempt never waits.
    pub fn delay_before(&self, attempt: u32) -> Duration {
        if attempt <= 1 {
            return Duration::ZERO;
        }
        match self.backoff {
            BackoffKind::None => Duration::ZERO,
            BackoffKind::Fixed => self.delay,
            BackoffKind::Exponential => {
                let exponent = (attempt - 2).min(16);
                self.delay.saturating_mul(1 << exponent)
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::immediate(3)
    }
}

/// Finds candidate reviews for a search key
pub struct RetrievalEngine {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    top_k: usize,
    namespace: Option<String>,
    policy: RetryPolicy,
}

impl RetrievalEngine {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self {
            embedder,
            index,
            top_k: 5,
            namespace: None,
            policy: RetryPolicy::default(),
        }
    }

    #[must_use]
    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    #[must_use]
    pub fn with_namespace(mut self, namespace: Option<String>) -> Self {
        self.namespace = namespace;
        self
    }

    #[must_use]
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Retrieve up to `top_k` matches, retrying until a non-empty result.
    ///
    /// Provider failures are logged and absorbed; exhausting every attempt
    /// yields an empty list rather than an error.
    pub async fn retrieve(&self, search_key: &str) -> Vec<RetrievedMatch> {
        let max_attempts = self.policy.max_attempts;

        for attempt in 1..=max_attempts {
            let delay = self.policy.delay_before(attempt);
            if !delay.is_zero() {
                debug!(attempt, ?delay, "Waiting before retrieval attempt");
                tokio::time::sleep(delay).await;
            }

            match self.attempt(search_key).await {
                Ok(matches) if !matches.is_empty() => {
                    info!(attempt, matches = matches.len(), "Retrieved candidate reviews");
                    return matches;
                }
                Ok(_) => {
                    warn!(attempt, max_attempts, "No valid vector data found");
                }
                Err(e) => {
                    warn!(
                        attempt,
                        max_attempts,
                        retryable = e.is_retryable(),
                        error = %e,
                        "Error querying vector index"
                    );
                }
            }
        }

        warn!(max_attempts, "Retrieval exhausted, continuing without context");
        Vec::new()
    }

    async fn attempt(&self, search_key: &str) -> Result<Vec<RetrievedMatch>> {
        let vector = self.embedder.embed(search_key).await?;
        self.index
            .query(&vector, self.top_k, self.namespace.as_deref())
            .await
    }
}
