//! Getting reviews into the vector index
//!
//! Two paths write vectors:
//! - [`IngestionService`] scrapes one review page per request (the scrape endpoint)
//! - [`SeedLoader`] bulk-loads a reviews JSON file (the `seed` command)

pub mod scraper;
pub mod seed;

use std::sync::Arc;

pub use scraper::HtmlPageScraper;
pub use scraper::PageScraper;
pub use scraper::ReviewPage;
pub use seed::SeedLoader;
pub use seed::SeedReport;
use serde_json::json;
use tracing::debug;
use tracing::info;
use tracing::warn;
use url::Url;

use crate::config::AppConfig;
use crate::embeddings::Embedder;
use crate::embeddings::EmbeddingClient;
use crate::errors::ProfragError;
use crate::errors::Result;
use crate::models::VectorRecord;
use crate::vector::PineconeIndex;
use crate::vector::VectorIndex;

/// Scrape, embed and upsert the reviews behind a link
pub struct IngestionService {
    scraper: Arc<dyn PageScraper>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
}

impl IngestionService {
    /// Build the service against the configured providers
    pub fn new(config: &AppConfig) -> Result<Self> {
        Ok(Self::from_services(
            config,
            Arc::new(HtmlPageScraper::new()?),
            Arc::new(EmbeddingClient::from_config(config)?),
            Arc::new(PineconeIndex::from_config(config)?),
        ))
    }

    pub fn from_services(
        config: &AppConfig,
        scraper: Arc<dyn PageScraper>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
    ) -> Self {
        Self {
            scraper,
            embedder,
            index,
            namespace: config.vector_index.ingest_namespace.clone(),
        }
    }

    /// Ingest every review on the page at `link`, returning how many were stored.
    ///
    /// Reviews are processed one at a time: one embedding call, then one
    /// upsert. The first failure aborts the remaining reviews.
    pub async fn ingest_link(&self, link: &str) -> Result<usize> {
        let parsed = Url::parse(link)
            .map_err(|e| ProfragError::ScrapeError(format!("invalid link {link:?}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ProfragError::ScrapeError(format!(
                "unsupported link scheme: {}",
                parsed.scheme()
            )));
        }

        let page = self.scraper.scrape(parsed.as_str()).await?;
        if page.reviews.is_empty() {
            warn!(professor = %page.professor_name, "Page has no reviews to ingest");
            return Ok(0);
        }

        let stamp = chrono::Utc::now().timestamp_millis();
        let mut inserted = 0;
        for (ordinal, review) in page.reviews.iter().enumerate() {
            let values = self.embedder.embed(review).await?;
            let record = VectorRecord {
                id: format!("{}-{stamp}-{ordinal}", page.professor_name),
                values,
                metadata: json!({
                    "professorName": page.professor_name,
                    "overallRating": page.overall_rating,
                    "review": review,
                }),
            };
            debug!(id = %record.id, "Upserting review");
            inserted += self.index.upsert(&[record], Some(&self.namespace)).await?;
        }

        info!(
            professor = %page.professor_name,
            inserted,
            namespace = %self.namespace,
            "Professor data scraped and inserted"
        );
        Ok(inserted)
    }
}
