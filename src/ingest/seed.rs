//! Bulk loading of a reviews JSON file into the vector index

use std::path::Path;
use std::sync::Arc;

use serde::Deserialize;
use serde::Serialize;
use tracing::info;

use crate::embeddings::Embedder;
use crate::errors::Result;
use crate::models::ReviewMetadata;
use crate::models::VectorRecord;
use crate::vector::VectorIndex;

/// Records per upsert request
pub const SEED_BATCH_SIZE: usize = 100;

/// `{"reviews": [...]}`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedFile {
    pub reviews: Vec<SeedReview>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedReview {
    pub professor: String,
    pub subject: String,
    pub stars: f64,
    pub university: String,
    pub review: String,
}

impl From<&SeedReview> for ReviewMetadata {
    fn from(review: &SeedReview) -> Self {
        Self {
            professor: review.professor.clone(),
            subject: review.subject.clone(),
            university: review.university.clone(),
            stars: review.stars,
            review: review.review.clone(),
        }
    }
}

/// Outcome of a seed run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SeedReport {
    pub embedded: usize,
    /// Count reported by the index for each batch, in order
    pub batches: Vec<usize>,
}

impl SeedReport {
    pub fn upserted(&self) -> usize {
        self.batches.iter().sum()
    }
}

pub struct SeedLoader {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    namespace: String,
    batch_size: usize,
}

impl SeedLoader {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        namespace: impl Into<String>,
    ) -> Self {
        Self {
            embedder,
            index,
            namespace: namespace.into(),
            batch_size: SEED_BATCH_SIZE,
        }
    }

    #[must_use]
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn read_file<P: AsRef<Path>>(path: P) -> Result<SeedFile> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Read `path` and seed every review in it
    pub async fn load_file<P: AsRef<Path>>(&self, path: P) -> Result<SeedReport> {
        let file = Self::read_file(path)?;
        self.seed(&file.reviews).await
    }

    /// Embed each review, then upsert in batches keyed by professor name.
    ///
    /// Any embedding or upsert failure aborts the run.
    pub async fn seed(&self, reviews: &[SeedReview]) -> Result<SeedReport> {
        info!("Embedding {} reviews", reviews.len());

        let mut records = Vec::with_capacity(reviews.len());
        for review in reviews {
            let values = self.embedder.embed(&review.review).await?;
            records.push(VectorRecord {
                id: review.professor.clone(),
                values,
                metadata: serde_json::to_value(ReviewMetadata::from(review))?,
            });
        }

        let mut report = SeedReport {
            embedded: records.len(),
            batches: Vec::new(),
        };

        for (number, batch) in records.chunks(self.batch_size).enumerate() {
            let upserted = self.index.upsert(batch, Some(&self.namespace)).await?;
            info!(
                batch = number + 1,
                upserted,
                namespace = %self.namespace,
                "Batch upserted"
            );
            report.batches.push(upserted);
        }

        info!(
            embedded = report.embedded,
            upserted = report.upserted(),
            "Seeding complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;
    use crate::errors::ProfragError;
    use crate::tests::fakes::CountingEmbedder;
    use crate::tests::fakes::ScriptedIndex;

    fn seed_review(professor: &str) -> SeedReview {
        SeedReview {
            professor: professor.to_string(),
            subject: "Mathematics".to_string(),
            stars: 4.0,
            university: "Test University".to_string(),
            review: format!("{professor} explains proofs well."),
        }
    }

    #[tokio::test]
    async fn test_seed_batches_and_metadata() {
        let embedder = Arc::new(CountingEmbedder::new());
        let index = Arc::new(ScriptedIndex::always_empty());
        let loader = SeedLoader::new(embedder.clone(), index.clone(), "ns1").with_batch_size(2);

        let reviews: Vec<_> = ["Dr. A", "Dr. B", "Dr. C"]
            .iter()
            .map(|p| seed_review(p))
            .collect();
        let report = loader.seed(&reviews).await.unwrap();

        assert_eq!(report.embedded, 3);
        assert_eq!(report.batches, vec![2, 1]);
        assert_eq!(embedder.calls(), 3);
        assert_eq!(
            embedder.inputs()[0],
            "Dr. A explains proofs well.".to_string()
        );
        assert_eq!(
            index.upsert_calls(),
            vec![(2, Some("ns1".to_string())), (1, Some("ns1".to_string()))]
        );

        let first = &index.upserted()[0];
        assert_eq!(first.id, "Dr. A");
        assert_eq!(first.metadata["professor"], "Dr. A");
        assert_eq!(first.metadata["subject"], "Mathematics");
        assert_eq!(first.metadata["stars"], 4.0);
    }

    #[tokio::test]
    async fn test_embedding_failure_aborts() {
        let embedder = Arc::new(CountingEmbedder::failing_first(1));
        let index = Arc::new(ScriptedIndex::always_empty());
        let loader = SeedLoader::new(embedder, index.clone(), "ns1");

        let err = loader.seed(&[seed_review("Dr. A")]).await.unwrap_err();
        assert!(matches!(err, ProfragError::EmbeddingError(_)));
        assert!(index.upsert_calls().is_empty());
    }

    #[tokio::test]
    async fn test_load_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"reviews": [{{"professor": "Dr. Emily Johnson", "subject": "Biology", "stars": 5, "university": "State University", "review": "Engaging."}}]}}"#
        )
        .unwrap();

        let index = Arc::new(ScriptedIndex::always_empty());
        let loader = SeedLoader::new(Arc::new(CountingEmbedder::new()), index.clone(), "ns1");
        let report = loader.load_file(file.path()).await.unwrap();

        assert_eq!(report.upserted(), 1);
        assert_eq!(index.upserted()[0].id, "Dr. Emily Johnson");
    }

    #[test]
    fn test_read_file_rejects_bad_json() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, "{{\"reviews\": 3}}").unwrap();
        assert!(matches!(
            SeedLoader::read_file(file.path()),
            Err(ProfragError::Serialization(_))
        ));
    }
}
