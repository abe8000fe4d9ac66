//! In-memory vector store
//!
//! Same upsert-by-id and cosine ordering as the pgvector store, without a
//! database. Used for tests and local experiments.

use std::collections::HashMap;

use async_trait::async_trait;
use pdfrag_core::{Result, SearchResult, StoredRecord};
use tokio::sync::RwLock;

use crate::{cosine_distance, VectorStore};

/// Vector store backed by a `HashMap` keyed by record id
#[derive(Debug)]
pub struct InMemoryVectorStore {
    collection: String,
    records: RwLock<HashMap<String, StoredRecord>>,
}

impl InMemoryVectorStore {
    /// Create an empty store for `collection`
    pub fn new(collection: impl Into<String>) -> Self {
        Self {
            collection: collection.into(),
            records: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored records
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// Look up a record by id
    pub async fn get(&self, id: &str) -> Option<StoredRecord> {
        self.records.read().await.get(id).cloned()
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()> {
        let mut store = self.records.write().await;
        for record in records {
            store.insert(record.id().to_string(), record.clone());
        }
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let store = self.records.read().await;

        let mut results: Vec<SearchResult> = store
            .values()
            .map(|record| SearchResult {
                record: record.chunk.clone(),
                distance: cosine_distance(&record.embedding, query_vector),
            })
            .collect();

        results.sort_by(|a, b| {
            a.distance
                .partial_cmp(&b.distance)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.record.id.cmp(&b.record.id))
        });
        results.truncate(limit);
        Ok(results)
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }
}
