//! pdfrag Core - Shared records, errors, and traits
//!
//! This crate defines the abstractions used by both pipelines:
//! - Common error types
//! - Chunk, stored-record and search-result records
//! - The LLM client trait
//! - Configuration management

pub mod config;

pub use config::{
    AppConfig, ConfigError, DatabaseConfig, LlmConfig, LoggingConfig, RetrievalConfig,
    SourceConfig, SplitterConfig, INGESTION_REQUIRED_KEYS,
};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Metadata attached to documents and chunks: string keys to scalar JSON values
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Error Types
// ============================================================================

/// Core error type shared by the pipelines and their clients
#[derive(Error, Debug)]
pub enum RagError {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("Load error")]
    Load(#[source] Box<dyn std::error::Error + Send + Sync>),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Prompt error: {0}")]
    Prompt(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub type Result<T> = std::result::Result<T, RagError>;

// ============================================================================
// Chunk and Search Types
// ============================================================================

/// A chunk ready for storage: identifier, text and sanitized metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DocumentChunk {
    /// Storage key (`doc-<index>`)
    pub id: String,

    /// Chunk text
    pub content: String,

    /// Metadata inherited from the source page, without empty values
    pub metadata: Metadata,
}

impl DocumentChunk {
    /// Create a new chunk
    pub fn new(id: impl Into<String>, content: impl Into<String>, metadata: Metadata) -> Self {
        Self {
            id: id.into(),
            content: content.into(),
            metadata,
        }
    }

    /// Storage key for the chunk at `index` in split order
    pub fn id_for_index(index: usize) -> String {
        format!("doc-{index}")
    }
}

/// A chunk together with its embedding, as persisted in the vector store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredRecord {
    pub chunk: DocumentChunk,
    pub embedding: Vec<f32>,
}

impl StoredRecord {
    pub fn new(chunk: DocumentChunk, embedding: Vec<f32>) -> Self {
        Self { chunk, embedding }
    }

    pub fn id(&self) -> &str {
        &self.chunk.id
    }
}

/// A retrieved chunk paired with its distance to the query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    /// Retrieved chunk
    pub record: DocumentChunk,

    /// Cosine distance to the query vector (lower is closer)
    pub distance: f32,
}

impl SearchResult {
    /// Cosine similarity to the query vector (higher is closer)
    pub fn similarity(&self) -> f32 {
        1.0 - self.distance
    }
}

// ============================================================================
// Traits
// ============================================================================

/// Trait for LLM clients
#[async_trait::async_trait]
pub trait LlmClient: Send + Sync {
    /// Generate a response for a fully rendered prompt
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Model identifier, for logging
    fn model(&self) -> &str;
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoClient;

    #[async_trait::async_trait]
    impl LlmClient for EchoClient {
        async fn generate(&self, prompt: &str) -> Result<String> {
            Ok(prompt.to_uppercase())
        }

        fn model(&self) -> &str {
            "echo"
        }
    }

    #[test]
    fn test_chunk_id_scheme() {
        assert_eq!(DocumentChunk::id_for_index(0), "doc-0");
        assert_eq!(DocumentChunk::id_for_index(41), "doc-41");
    }

    #[test]
    fn test_similarity_from_distance() {
        let result = SearchResult {
            record: DocumentChunk::new("doc-0", "text", Metadata::new()),
            distance: 0.25,
        };
        assert!((result.similarity() - 0.75).abs() < f32::EPSILON);
    }

    #[test]
    fn test_config_error_converts() {
        let err: RagError = ConfigError::MissingRequired(vec!["PDF_PATH".to_string()]).into();
        assert!(matches!(err, RagError::Config(_)));
        assert_eq!(err.to_string(), "Missing required configuration: PDF_PATH");
    }

    #[test]
    fn test_load_error_keeps_cause_as_source() {
        use std::error::Error as _;

        let cause = std::io::Error::new(std::io::ErrorKind::NotFound, "manual.pdf not found");
        let err = RagError::Load(Box::new(cause));

        assert_eq!(err.to_string(), "Load error");
        assert_eq!(err.source().unwrap().to_string(), "manual.pdf not found");
    }

    #[test]
    fn test_llm_client_object() {
        let client: Box<dyn LlmClient> = Box::new(EchoClient);
        let answer = tokio_test::block_on(client.generate("olá")).unwrap();
        assert_eq!(answer, "OLÁ");
        assert_eq!(client.model(), "echo");
    }
}
