//! Question-answering pipeline
//!
//! question → embedding → top-k chunks → context → prompt → chat model →
//! answer text.
//!
//! Author: hephaex@gmail.com

use std::sync::Arc;
use std::time::Instant;

use pdfrag_core::{AppConfig, LlmClient, Result, SearchResult};
use pdfrag_vector::{EmbeddingClient, OpenAiEmbedding, PgVectorStore, VectorStore};

use crate::llm::OpenAiClient;
use crate::prompt::render_search_prompt;

/// Retrieval-augmented answering over one vector collection
pub struct SearchPipeline {
    embedder: Arc<dyn EmbeddingClient>,
    store: Arc<dyn VectorStore>,
    llm: Arc<dyn LlmClient>,
    top_k: usize,
}

impl SearchPipeline {
    /// Assemble a pipeline from its collaborators
    pub fn new(
        embedder: Arc<dyn EmbeddingClient>,
        store: Arc<dyn VectorStore>,
        llm: Arc<dyn LlmClient>,
        top_k: usize,
    ) -> Self {
        Self {
            embedder,
            store,
            llm,
            top_k,
        }
    }

    /// Build the production pipeline: OpenAI embeddings, pgvector, OpenAI chat
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let embedder = OpenAiEmbedding::from_config(&config.llm)?;
        let llm = OpenAiClient::from_config(&config.llm)?;
        let store = PgVectorStore::connect(&config.database).await?;

        Ok(Self::new(
            Arc::new(embedder),
            Arc::new(store),
            Arc::new(llm),
            config.retrieval.top_k,
        ))
    }

    /// Number of chunks retrieved per question
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Chunks closest to `question`, closest first
    pub async fn retrieve(&self, question: &str) -> Result<Vec<SearchResult>> {
        let query_vector = self.embedder.embed(question).await?;
        self.store.search(&query_vector, self.top_k).await
    }

    /// Answer `question` from the stored chunks
    pub async fn answer(&self, question: &str) -> Result<String> {
        let start_time = Instant::now();

        let results = self.retrieve(question).await?;
        tracing::debug!(
            retrieved = results.len(),
            collection = %self.store.collection_name(),
            "Context retrieved"
        );

        let contexto = assemble_context(&results);
        let prompt = render_search_prompt(&contexto, question)?;

        let completion = self.llm.generate(&prompt).await?;
        let answer = parse_output(completion);

        tracing::info!(
            model = %self.llm.model(),
            retrieved = results.len(),
            elapsed_ms = start_time.elapsed().as_millis() as u64,
            "Question answered"
        );

        Ok(answer)
    }
}

/// Join retrieved chunk texts with newlines, in retrieval order
pub fn assemble_context(results: &[SearchResult]) -> String {
    results
        .iter()
        .map(|r| r.record.content.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Completion text is the answer; no post-processing
pub fn parse_output(completion: String) -> String {
    completion
}

/// Answer `question` against the collection named in the configuration
pub async fn search_prompt(config: &AppConfig, question: &str) -> Result<String> {
    let pipeline = SearchPipeline::from_config(config).await?;
    pipeline.answer(question).await
}
