//! pdfrag Parser - Document loading and chunking
//!
//! Turns a PDF into the chunks that get embedded:
//! - `PdfParser` loads one `Document` per page
//! - `RecursiveCharacterSplitter` cuts pages into overlapping chunks
//! - `sanitize_metadata` drops empty metadata values
//!
//! Loaders implement the `DocumentLoader` trait so the ingestion pipeline
//! can be driven by other sources in tests.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

pub mod metadata;
pub mod pdf;
pub mod splitter;

pub use metadata::sanitize_metadata;
pub use pdf::PdfParser;
pub use splitter::{RecursiveCharacterSplitter, SplitterError, DEFAULT_SEPARATORS};

/// Metadata attached to documents and chunks: string keys to scalar JSON values
pub type Metadata = serde_json::Map<String, serde_json::Value>;

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur while loading a document
#[derive(Error, Debug)]
pub enum ParserError {
    /// IO error while reading the file
    #[error("IO error reading file: {path}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// PDF parsing error
    #[error("PDF parsing error: {0}")]
    PdfError(String),

    /// File is encrypted and cannot be parsed
    #[error("File is encrypted and requires a password: {0}")]
    EncryptedFile(String),

    /// File is corrupted or malformed
    #[error("File is corrupted or malformed: {0}")]
    CorruptedFile(String),
}

pub type Result<T> = std::result::Result<T, ParserError>;

// ============================================================================
// Document Types
// ============================================================================

/// A unit of loaded text, one per PDF page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Extracted text
    pub content: String,

    /// Metadata describing where the text came from
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with empty metadata
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            metadata: Metadata::new(),
        }
    }

    /// Add a metadata entry
    pub fn with_metadata(
        mut self,
        key: impl Into<String>,
        value: impl Into<serde_json::Value>,
    ) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }

    /// Get total character count
    pub fn char_count(&self) -> usize {
        self.content.chars().count()
    }
}

/// A slice of a document's text carrying the parent's metadata
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TextChunk {
    /// Chunk content
    pub content: String,

    /// Metadata inherited from the parent document
    pub metadata: Metadata,
}

// ============================================================================
// Loader Trait
// ============================================================================

/// Trait for document loaders
pub trait DocumentLoader: Send + Sync {
    /// Load a file into documents, in source order
    fn load(&self, path: &Path) -> Result<Vec<Document>>;
}

// ============================================================================
// Tests
// ============================================================================
