//! pdfrag Configuration Management
//!
//! Configuration is assembled once at startup from environment variables
//! (optionally seeded from a `.env` file) or a TOML file, then passed
//! explicitly to the ingestion and query pipelines.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Environment keys that must be present before ingestion starts,
/// in the order they are reported.
pub const INGESTION_REQUIRED_KEYS: [&str; 4] = [
    "PDF_PATH",
    "OPENAI_API_KEY",
    "DATABASE_URL",
    "PG_VECTOR_COLLECTION_NAME",
];

/// Main application configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Source document location
    pub source: SourceConfig,

    /// Vector store connection
    pub database: DatabaseConfig,

    /// Embedding and chat model configuration
    pub llm: LlmConfig,

    /// Chunking parameters
    pub splitter: SplitterConfig,

    /// Similarity search parameters
    pub retrieval: RetrievalConfig,

    /// Logging configuration
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// Load configuration from the process environment.
    ///
    /// A `.env` file in the working directory (or any parent) is loaded
    /// first; variables already set in the environment win.
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv(dotenvy::dotenv())?;
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    ///
    /// Empty values are treated as absent.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        config.apply_lookup(&lookup)?;
        Ok(config)
    }

    /// Load from a TOML file
    pub fn from_file(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = std::fs::read_to_string(&path).map_err(|e| ConfigError::FileReadError {
            path: path.clone(),
            source: e,
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path,
            message: e.to_string(),
        })?;
        config.validate_values()?;
        Ok(config)
    }

    /// Merge with environment variables (env takes precedence)
    pub fn with_env_override(mut self) -> Result<Self, ConfigError> {
        load_dotenv(dotenvy::dotenv())?;
        self.apply_lookup(&|key: &str| std::env::var(key).ok())?;
        Ok(self)
    }

    fn apply_lookup<F>(&mut self, lookup: &F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.is_empty());

        if let Some(path) = get("PDF_PATH") {
            self.source.pdf_path = Some(PathBuf::from(path));
        }

        // PostgreSQL / pgvector
        if let Some(url) = get("DATABASE_URL") {
            self.database.url = Some(url);
        }
        if let Some(name) = get("PG_VECTOR_COLLECTION_NAME") {
            self.database.collection_name = Some(name);
        }

        // OpenAI
        if let Some(key) = get("OPENAI_API_KEY") {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.llm.model = model;
        }
        if let Some(model) = get("OPENAI_EMBEDDING_MODEL") {
            self.llm.embedding_model = model;
        }

        // Logging
        if let Some(level) = get("LOG_LEVEL") {
            self.logging.level = level;
        }

        self.validate_values()
    }

    /// Check that every key ingestion depends on is set.
    ///
    /// All missing keys are reported together rather than stopping at the
    /// first one.
    pub fn validate_for_ingestion(&self) -> Result<(), ConfigError> {
        let present = [
            self.source.pdf_path.is_some(),
            self.llm.api_key.is_some(),
            self.database.url.is_some(),
            self.database.collection_name.is_some(),
        ];

        let missing: Vec<String> = INGESTION_REQUIRED_KEYS
            .iter()
            .zip(present)
            .filter(|(_, ok)| !ok)
            .map(|(key, _)| key.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::MissingRequired(missing))
        }
    }

    fn validate_values(&self) -> Result<(), ConfigError> {
        if self.splitter.chunk_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "splitter.chunk_size".to_string(),
                value: "0".to_string(),
            });
        }
        if self.splitter.chunk_overlap > self.splitter.chunk_size {
            return Err(ConfigError::InvalidValue {
                key: "splitter.chunk_overlap".to_string(),
                value: self.splitter.chunk_overlap.to_string(),
            });
        }
        if self.retrieval.top_k == 0 {
            return Err(ConfigError::InvalidValue {
                key: "retrieval.top_k".to_string(),
                value: "0".to_string(),
            });
        }
        if self.llm.embedding_batch_size == 0 {
            return Err(ConfigError::InvalidValue {
                key: "llm.embedding_batch_size".to_string(),
                value: "0".to_string(),
            });
        }
        Ok(())
    }
}

/// A missing `.env` file is fine; an unreadable or malformed one is not
fn load_dotenv<T>(result: dotenvy::Result<T>) -> Result<(), ConfigError> {
    match result {
        Ok(_) => Ok(()),
        Err(e) if e.not_found() => Ok(()),
        Err(e) => Err(ConfigError::EnvFileError(e)),
    }
}

/// Source document configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct SourceConfig {
    /// Path to the PDF to ingest
    pub pdf_path: Option<PathBuf>,
}

/// Vector store connection configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    /// PostgreSQL connection URL (pgvector extension required)
    pub url: Option<String>,

    /// Name of the vector collection
    pub collection_name: Option<String>,

    /// Connection pool size
    pub pool_size: u32,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            collection_name: None,
            pool_size: 5,
        }
    }
}

/// Embedding and chat model configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    /// OpenAI API key
    pub api_key: Option<String>,

    /// OpenAI API base URL (for compatible APIs)
    pub base_url: String,

    /// Chat model name
    pub model: String,

    /// Embedding model name
    pub embedding_model: String,

    /// Sampling temperature for generation
    pub temperature: f32,

    /// Maximum tokens for completion (provider default when unset)
    pub max_tokens: Option<u32>,

    /// Inputs per embedding request
    pub embedding_batch_size: usize,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4o-mini".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            temperature: 0.7,
            max_tokens: None,
            embedding_batch_size: 1000,
        }
    }
}

/// Chunking parameters, measured in characters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SplitterConfig {
    /// Target chunk length
    pub chunk_size: usize,

    /// Overlap between consecutive chunks of the same document
    pub chunk_overlap: usize,
}

impl Default for SplitterConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
        }
    }
}

/// Similarity search parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    /// Number of chunks retrieved per question
    pub top_k: usize,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self { top_k: 10 }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// JSON format for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json_format: false,
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    FileReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file {path}: {message}")]
    ParseError { path: PathBuf, message: String },

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Missing required configuration: {}", .0.join(", "))]
    MissingRequired(Vec<String>),

    #[error("Failed to load .env file")]
    EnvFileError(#[source] dotenvy::Error),
}
