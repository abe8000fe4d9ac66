//! PostgreSQL + pgvector implementation of the vector store
//!
//! Records live in two tables shared by every collection:
//! `langchain_pg_collection` (one row per named collection) and
//! `langchain_pg_embedding` (one row per chunk, keyed by chunk id).
//! Collections written by earlier LangChain-based ingestion runs remain
//! readable.
//!
//! Author: hephaex@gmail.com

use async_trait::async_trait;
use pdfrag_core::{
    ConfigError, DatabaseConfig, DocumentChunk, Metadata, RagError, Result, SearchResult,
    StoredRecord,
};
use sqlx::postgres::{PgPool, PgPoolOptions};
use sqlx::Row;
use uuid::Uuid;

const COLLECTION_TABLE: &str = "langchain_pg_collection";
const EMBEDDING_TABLE: &str = "langchain_pg_embedding";

/// pgvector-backed store bound to a single collection
pub struct PgVectorStore {
    pool: PgPool,
    collection: String,
    collection_id: Uuid,
}

impl PgVectorStore {
    /// Connect, create the schema if needed, and get or create the collection
    pub async fn connect(config: &DatabaseConfig) -> Result<Self> {
        let url = config
            .url
            .as_deref()
            .ok_or_else(|| ConfigError::MissingRequired(vec!["DATABASE_URL".to_string()]))?;
        let collection = config.collection_name.clone().ok_or_else(|| {
            ConfigError::MissingRequired(vec!["PG_VECTOR_COLLECTION_NAME".to_string()])
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.pool_size)
            .connect(url)
            .await
            .map_err(|e| RagError::VectorStore(format!("PostgreSQL connection failed: {e}")))?;

        Self::from_pool(pool, collection).await
    }

    /// Use an existing pool
    pub async fn from_pool(pool: PgPool, collection: impl Into<String>) -> Result<Self> {
        let collection = collection.into();
        init_schema(&pool).await?;
        let collection_id = get_or_create_collection(&pool, &collection).await?;

        tracing::debug!(collection = %collection, %collection_id, "pgvector collection ready");

        Ok(Self {
            pool,
            collection,
            collection_id,
        })
    }

    /// Get the connection pool
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Number of records stored in this collection
    pub async fn count(&self) -> Result<i64> {
        let row: (i64,) = sqlx::query_as(&format!(
            "SELECT COUNT(*) FROM {EMBEDDING_TABLE} WHERE collection_id = $1"
        ))
        .bind(self.collection_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| RagError::VectorStore(format!("Failed to count records: {e}")))?;

        Ok(row.0)
    }
}

/// Create the extension and tables (run once per connection, idempotent)
async fn init_schema(pool: &PgPool) -> Result<()> {
    let statements = [
        "CREATE EXTENSION IF NOT EXISTS vector".to_string(),
        format!(
            "CREATE TABLE IF NOT EXISTS {COLLECTION_TABLE} (\
                uuid UUID PRIMARY KEY, \
                name VARCHAR NOT NULL UNIQUE, \
                cmetadata JSON\
            )"
        ),
        format!(
            "CREATE TABLE IF NOT EXISTS {EMBEDDING_TABLE} (\
                id VARCHAR PRIMARY KEY, \
                collection_id UUID REFERENCES {COLLECTION_TABLE}(uuid) ON DELETE CASCADE, \
                embedding VECTOR, \
                document VARCHAR, \
                cmetadata JSONB\
            )"
        ),
        format!(
            "CREATE INDEX IF NOT EXISTS ix_cmetadata_gin \
             ON {EMBEDDING_TABLE} USING gin (cmetadata jsonb_path_ops)"
        ),
    ];

    for statement in &statements {
        sqlx::query(statement)
            .execute(pool)
            .await
            .map_err(|e| RagError::VectorStore(format!("Failed to initialize schema: {e}")))?;
    }

    Ok(())
}

async fn get_or_create_collection(pool: &PgPool, name: &str) -> Result<Uuid> {
    sqlx::query(&format!(
        "INSERT INTO {COLLECTION_TABLE} (uuid, name, cmetadata) VALUES ($1, $2, '{{}}'::json) \
         ON CONFLICT (name) DO NOTHING"
    ))
    .bind(Uuid::new_v4())
    .bind(name)
    .execute(pool)
    .await
    .map_err(|e| RagError::VectorStore(format!("Failed to create collection: {e}")))?;

    let row: (Uuid,) = sqlx::query_as(&format!(
        "SELECT uuid FROM {COLLECTION_TABLE} WHERE name = $1"
    ))
    .bind(name)
    .fetch_one(pool)
    .await
    .map_err(|e| RagError::VectorStore(format!("Failed to load collection: {e}")))?;

    Ok(row.0)
}

/// pgvector text representation: `[1,0.5,-2]`
fn vector_literal(vector: &[f32]) -> String {
    let values: Vec<String> = vector.iter().map(|v| v.to_string()).collect();
    format!("[{}]", values.join(","))
}

fn search_error(e: sqlx::Error) -> RagError {
    RagError::VectorStore(format!("Vector search failed: {e}"))
}

fn metadata_from_json(value: Option<serde_json::Value>) -> Metadata {
    match value {
        Some(serde_json::Value::Object(map)) => map,
        _ => Metadata::new(),
    }
}

#[async_trait]
impl super::VectorStore for PgVectorStore {
    async fn upsert(&self, records: &[StoredRecord]) -> Result<()> {
        if records.is_empty() {
            return Ok(());
        }

        let upsert_sql = format!(
            "INSERT INTO {EMBEDDING_TABLE} (id, collection_id, embedding, document, cmetadata) \
             VALUES ($1, $2, $3::vector, $4, $5) \
             ON CONFLICT (id) DO UPDATE SET \
                collection_id = EXCLUDED.collection_id, \
                embedding = EXCLUDED.embedding, \
                document = EXCLUDED.document, \
                cmetadata = EXCLUDED.cmetadata"
        );

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| RagError::VectorStore(format!("Failed to begin transaction: {e}")))?;

        for record in records {
            let metadata = serde_json::Value::Object(record.chunk.metadata.clone());

            sqlx::query(&upsert_sql)
                .bind(record.id())
                .bind(self.collection_id)
                .bind(vector_literal(&record.embedding))
                .bind(&record.chunk.content)
                .bind(metadata)
                .execute(&mut *tx)
                .await
                .map_err(|e| {
                    RagError::VectorStore(format!("Failed to upsert {}: {e}", record.id()))
                })?;
        }

        tx.commit()
            .await
            .map_err(|e| RagError::VectorStore(format!("Failed to commit upsert: {e}")))?;

        tracing::debug!(
            collection = %self.collection,
            count = records.len(),
            "Upserted records"
        );
        Ok(())
    }

    async fn search(&self, query_vector: &[f32], limit: usize) -> Result<Vec<SearchResult>> {
        let search_sql = format!(
            "SELECT id, document, cmetadata, (embedding <=> $1::vector) AS distance \
             FROM {EMBEDDING_TABLE} \
             WHERE collection_id = $2 \
             ORDER BY distance ASC \
             LIMIT $3"
        );

        let rows = sqlx::query(&search_sql)
            .bind(vector_literal(query_vector))
            .bind(self.collection_id)
            .bind(limit as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(search_error)?;

        rows.iter()
            .map(|row| -> Result<SearchResult> {
                let id: String = row.try_get("id").map_err(search_error)?;
                let content: Option<String> =
                    row.try_get("document").map_err(search_error)?;
                let metadata: Option<serde_json::Value> =
                    row.try_get("cmetadata").map_err(search_error)?;
                let distance: f64 = row.try_get("distance").map_err(search_error)?;

                Ok(SearchResult {
                    record: DocumentChunk::new(
                        id,
                        content.unwrap_or_default(),
                        metadata_from_json(metadata),
                    ),
                    distance: distance as f32,
                })
            })
            .collect()
    }

    fn collection_name(&self) -> &str {
        &self.collection
    }
}
