//! pdfrag Vector - Embeddings and vector storage
//!
//! Provides the embedding client and the vector store abstraction
//! used to persist chunk embeddings and search them by similarity.

use async_trait::async_trait;
use pdfrag_core::{Result, SearchResult, StoredRecord};

pub mod embedding;
pub mod memory;
pub mod pgvector_store;

pub use embedding::{EmbeddingClient, OpenAiEmbedding};
pub use memory::InMemoryVectorStore;
pub use pgvector_store::PgVectorStore;

/// Trait for vector database operations
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert records, replacing any existing record with the same id
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()>;

    /// Return the `limit` records closest to `query_vector`, closest first
    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>>;

    /// Name of the collection this store reads and writes
    fn collection_name(&self) -> &str;
}

/// Cosine distance between two vectors (`1 - cosine similarity`).
///
/// Zero-magnitude vectors are treated as maximally distant.
pub fn cosine_distance(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 1.0;
    }
    1.0 - dot / (norm_a * norm_b)
}
