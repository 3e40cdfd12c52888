//! Vector index access
//!
//! The chat path only needs nearest-neighbour queries; the ingestion path only
//! needs upserts. Both go through [`VectorIndex`] so tests can substitute an
//! in-memory index.

pub mod pinecone;

use async_trait::async_trait;
pub use pinecone::PineconeIndex;

use crate::errors::Result;
use crate::models::RetrievedMatch;
use crate::models::VectorRecord;

/// Nearest-neighbour store holding review embeddings
#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Return up to `top_k` matches for `vector`, metadata included, best first.
    async fn query(
        &self,
        vector: &[f32],
        top_k: usize,
        namespace: Option<&str>,
    ) -> Result<Vec<RetrievedMatch>>;

    /// Insert or overwrite `records`, returning how many the store accepted.
    async fn upsert(&self, records: &[VectorRecord], namespace: Option<&str>) -> Result<usize>;
}
