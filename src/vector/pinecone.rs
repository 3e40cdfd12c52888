//! Pinecone data-plane REST client

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde::Serialize;
use tracing::debug;

use super::VectorIndex;
use crate::config::AppConfig;
use crate::errors::ProfragError;
use crate::errors::Result;
use crate::models::RetrievedMatch;
use crate::models::VectorRecord;

const API_VERSION: &str = "2024-07";

pub struct PineconeIndex {
    host: String,
    api_key: String,
    client: Client,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct QueryRequest<'a> {
    vector: &'a [f32],
    top_k: usize,
    include_metadata: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
struct QueryResponse {
    #[serde(default)]
    matches: Vec<RetrievedMatch>,
}

#[derive(Serialize)]
struct UpsertRequest<'a> {
    vectors: &'a [VectorRecord],
    #[serde(skip_serializing_if = "Option::is_none")]
    namespace: Option<&'a str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct UpsertResponse {
    #[serde(default)]
    upserted_count: usize,
}

impl PineconeIndex {
    pub fn new(host: impl Into<String>, api_key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .map_err(|e| ProfragError::HttpError(e.to_string()))?;

        let mut host = host.into().trim_end_matches('/').to_string();
        if !host.starts_with("http://") && !host.starts_with("https://") {
            host = format!("https://{host}");
        }

        Ok(Self {
            host,
            api_key: api_key.into(),
            client,
        })
    }

    pub fn from_config(config: &AppConfig) -> Result<Self> {
        let api_key = config.vector_index.api_key.clone().ok_or_else(|| {
            ProfragError::ConfigError("vector index API key missing".to_string())
        })?;
        Self::new(config.vector_index.host.clone(), api_key)
    }

    async fn post<B: Serialize + Sync, R: DeserializeOwned + Send>(
        &self,
        route: &str,
        body: &B,
    ) -> Result<R> {
        let url = format!("{}{route}", self.host);
        debug!("Calling Pinecone API: {}", url);

        let response = self
            .client
            .post(&url)
            .header("Api-Key", &self.api_key)
            .header("X-Pinecone-API-Version", API_VERSION)
            .json(body)
            .send()
            .await
            .map_err(|e| ProfragError::HttpError(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(ProfragError::VectorIndexError(format!(
                "Pinecone API error ({status}): {error_text}"
            )));
        }

        response
            .json()
            .await
            .map_err(|e| ProfragError::VectorIndexError(format!("Failed to parse response: {e}")))
    }
}

#[async_trait]
impl VectorIndex for PineconeIndex {
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<RetrievedMatch>> {
        let request = QueryRequest {
            vector,
            top_k,
            include_metadata: true,
            namespace,
        };
        let response: QueryResponse = self.post("/query", &request).await?;
        Ok(response.matches)
    }

    async fn upsert(&self, records: &[VectorRecord], namespace: Option<&str>) -> Result<usize> {
        let request = UpsertRequest {
            vectors: records,
            namespace,
        };
        let response: UpsertResponse = self.post("/vectors/upsert", &request).await?;
        Ok(response.upserted_count)
    }
}
