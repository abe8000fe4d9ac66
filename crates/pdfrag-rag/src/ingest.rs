//! Ingestion pipeline
//!
//! PDF → pages → chunks → sanitized metadata → `doc-<n>` ids →
//! embeddings → upsert into the vector collection.
//!
//! Every step runs after the previous one finishes. Failures are returned
//! as they occur; nothing is retried and nothing partial is tracked.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use pdfrag_core::{AppConfig, ConfigError, DocumentChunk, RagError, Result, StoredRecord};
use pdfrag_parser::{
    sanitize_metadata, DocumentLoader, PdfParser, RecursiveCharacterSplitter, TextChunk,
};
use pdfrag_vector::{EmbeddingClient, OpenAiEmbedding, PgVectorStore, VectorStore};

/// Outcome of an ingestion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IngestionReport {
    /// Number of chunks written (ids `doc-0..doc-(n-1)`)
    pub chunk_count: usize,

    /// Destination collection
    pub collection_name: String,
}

/// Sequential ingestion pipeline
pub struct IngestionPipeline {
    loader: Arc<dyn DocumentLoader>,
    splitter: RecursiveCharacterSplitter,
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
}

impl IngestionPipeline {
    /// Assemble a pipeline from its collaborators
    pub fn new(
        loader: Arc<dyn DocumentLoader>,
        splitter: RecursiveCharacterSplitter,
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
    ) -> Self {
        Self {
            loader,
            splitter,
            embedder,
            store,
        }
    }

    /// Build the production pipeline: PDF loader, OpenAI embeddings, pgvector.
    ///
    /// All required settings are checked before anything is opened or
    /// connected.
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        config.validate_for_ingestion()?;

        let splitter = RecursiveCharacterSplitter::new(
            config.splitter.chunk_size,
            config.splitter.chunk_overlap,
        )
        .map_err(|e| RagError::Other(e.into()))?;
        let embedder = OpenAiEmbedding::from_config(&config.llm)?;
        let store = PgVectorStore::connect(&config.database).await?;

        Ok(Self::new(
            Arc::new(PdfParser::new()),
            splitter,
            Arc::new(embedder),
            Arc::new(store),
        ))
    }

    /// Destination collection
    pub fn collection_name(&self) -> &str {
        self.store.collection_name()
    }

    /// Ingest one file
    pub async fn run(&self, path: &Path) -> Result<IngestionReport> {
        let start_time = Instant::now();
        let collection = self.store.collection_name().to_string();
        tracing::info!(path = %path.display(), collection = %collection, "Ingestion started");

        // 1. Load
        let documents = self
            .loader
            .load(path)
            .map_err(|e| RagError::Load(Box::new(e)))?;
        tracing::debug!(pages = documents.len(), "Document loaded");

        // 2. Split
        let chunks = self.splitter.split_documents(&documents);
        tracing::debug!(chunks = chunks.len(), "Document split");

        // 3-4. Sanitize metadata and assign ids
        let chunks = assign_ids(chunks);

        // 5. Embed and write
        let texts: Vec<String> = chunks.iter().map(|c| c.content.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;
        if embeddings.len() != chunks.len() {
            return Err(RagError::Embedding(format!(
                "Expected {} embeddings, received {}",
                chunks.len(),
                embeddings.len()
            )));
        }

        let records: Vec<StoredRecord> = chunks
            .into_iter()
            .zip(embeddings)
            .map(|(chunk, embedding)| StoredRecord::new(chunk, embedding))
            .collect();
        self.store.upsert(&records).await?;

        // 6. Report
        let report = IngestionReport {
            chunk_count: records.len(),
            collection_name: collection,
        };
        tracing::info!(
            chunks = report.chunk_count,
            collection = %report.collection_name,
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Ingestion finished"
        );

        Ok(report)
    }
}

/// Give chunks their storage ids (`doc-0`, `doc-1`, … in split order) and
/// drop empty metadata values
pub fn assign_ids(chunks: Vec<TextChunk>) -> Vec<DocumentChunk> {
    chunks
        .into_iter()
        .enumerate()
        .map(|(index, chunk)| {
            DocumentChunk::new(
                DocumentChunk::id_for_index(index),
                chunk.content,
                sanitize_metadata(&chunk.metadata),
            )
        })
        .collect()
}

/// Run ingestion for the PDF named in the configuration
pub async fn ingest(config: &AppConfig) -> Result<IngestionReport> {
    config.validate_for_ingestion()?;
    let path: PathBuf = config
        .source
        .pdf_path
        .clone()
        .ok_or_else(|| ConfigError::MissingRequired(vec!["PDF_PATH".to_string()]))?;

    let pipeline = IngestionPipeline::from_config(config).await?;
    pipeline.run(&path).await
}
