//! Embedding API client for OpenAI-compatible and Ollama endpoints

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::Embedder;
use crate::config::AppConfig;
use crate::config::EmbeddingProviderKind;
use crate::errors::ProfragError;
use crate::errors::Result;

/// Client for generating embeddings from a hosted or local provider
pub struct EmbeddingClient {
    provider: EmbeddingProviderKind,
    model: String,
    endpoint: String,
    api_key: Option<String>,
    dimension: Option<usize>,
    client: Client,
}

impl EmbeddingClient {
    /// Create a new embedding client
    pub fn new(
        provider: EmbeddingProviderKind,
        model: String,
        endpoint: String,
        api_key: Option<String>,
    ) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .pool_idle_timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProfragError::HttpError(e.to_string()))?;

        Ok(Self {
            provider,
            model,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            dimension: None,
            client,
        })
    }

    /// Create a client from application configuration
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let embeddings = &config.embeddings;
        Ok(Self::new(
            embeddings.provider,
            embeddings.model.clone(),
            embeddings.endpoint.clone(),
            embeddings.api_key.clone(),
        )?
        .with_dimension(embeddings.dimension))
    }

    /// Reject vectors whose length differs from `dimension`
    #[must_use]
    pub fn with_dimension(mut self, dimension: usize) -> Self {
        self.dimension = Some(dimension);
        self
    }

    fn check_dimension(&self, embedding: Vec<f32>) -> Result<Vec<f32>> {
        match self.dimension {
            Some(expected) if embedding.len() != expected => {
                Err(ProfragError::EmbeddingError(format!(
                    "Expected {expected} dimensions, got {}",
                    embedding.len()
                )))
            }
            _ => Ok(embedding),
        }
    }

    /// Generate embedding using `OpenAI` API
    async fn generate_openai(&self, text: &str) -> Result<Vec<f32>> {
        let api_key = self
            .api_key
            .as_ref()
            .ok_or_else(|| ProfragError::ConfigError("OpenAI API key not provided".to_string()))?;

        #[derive(Serialize)]
        struct OpenAIRequest<'a> {
            input: &'a str,
            model: &'a str,
        }

        #[derive(Deserialize)]
        struct OpenAIResponse {
            data: Vec<EmbeddingData>,
        }

        #[derive(Deserialize)]
        struct EmbeddingData {
            embedding: Vec<f32>,
        }

        let url = format!("{}/embeddings", self.endpoint);
        debug!("Calling OpenAI embeddings API: {}", url);

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .json(&OpenAIRequest {
                input: text,
                model: &self.model,
            })
            .send()
            .await
            .map_err(|e| ProfragError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProfragError::EmbeddingError(format!(
                "OpenAI API error ({status}): {error_text}"
            )));
        }

        let result: OpenAIResponse = response
            .json()
            .await
            .map_err(|e| ProfragError::EmbeddingError(format!("Failed to parse response: {e}")))?;

        result
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| ProfragError::EmbeddingError("No embedding in response".to_string()))
    }

    /// Generate embedding using Ollama API
    async fn generate_ollama(&self, text: &str) -> Result<Vec<f32>> {
        #[derive(Serialize)]
        struct OllamaRequest<'a> {
            model: &'a str,
            prompt: &'a str,
        }

        #[derive(Deserialize)]
        struct OllamaResponse {
            embedding: Vec<f32>,
        }

        let url = format!("{}/api/embeddings", self.endpoint);
        debug!("Calling Ollama embeddings API: {}", url);

        let response = self
            .client
            .post(&url)
            .json(&OllamaRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| ProfragError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProfragError::EmbeddingError(format!(
                "Ollama API error ({status}): {error_text}"
            )));
        }

        let result: OllamaResponse = response
            .json()
            .await
            .map_err(|e| ProfragError::EmbeddingError(format!("Failed to parse response: {e}")))?;

        Ok(result.embedding)
    }
}

#[async_trait]
impl Embedder for EmbeddingClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embedding = match self.provider {
            EmbeddingProviderKind::OpenAI => self.generate_openai(text).await?,
            EmbeddingProviderKind::Ollama => self.generate_ollama(text).await?,
        };
        self.check_dimension(embedding)
    }
}
