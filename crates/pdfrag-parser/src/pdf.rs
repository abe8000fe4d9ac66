//! PDF document loader using pdf-extract
//!
//! Extracts text page by page and produces one `Document` per page with
//! `source`, `page` (0-based), `page_label` and `total_pages` metadata.

use std::path::Path;

use serde_json::Value;

use crate::{Document, DocumentLoader, Metadata, ParserError, Result};

const PDF_MAGIC: &[u8] = b"%PDF-";

/// PDF document loader
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfParser;

impl PdfParser {
    /// Create a new PDF loader
    pub fn new() -> Self {
        Self
    }

    /// Extract text from each page of a PDF held in memory
    fn extract_pages(&self, source: &str, bytes: &[u8]) -> Result<Vec<String>> {
        if !bytes.starts_with(PDF_MAGIC) {
            return Err(ParserError::CorruptedFile(format!(
                "{source}: missing PDF header"
            )));
        }

        pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| {
            let message = e.to_string();
            if message.to_lowercase().contains("encrypt") {
                ParserError::EncryptedFile(source.to_string())
            } else {
                ParserError::PdfError(format!("{source}: {message}"))
            }
        })
    }
}

/// Wrap extracted page texts into documents, in page order
pub fn documents_from_pages(source: &str, pages: Vec<String>) -> Vec<Document> {
    let total_pages = pages.len();

    pages
        .into_iter()
        .enumerate()
        .map(|(index, content)| {
            let mut metadata = Metadata::new();
            metadata.insert("source".to_string(), Value::from(source));
            metadata.insert("page".to_string(), Value::from(index));
            metadata.insert("page_label".to_string(), Value::from((index + 1).to_string()));
            metadata.insert("total_pages".to_string(), Value::from(total_pages));

            Document { content, metadata }
        })
        .collect()
}

impl DocumentLoader for PdfParser {
    fn load(&self, path: &Path) -> Result<Vec<Document>> {
        let source = path.display().to_string();

        let bytes = std::fs::read(path).map_err(|e| ParserError::IoError {
            path: source.clone(),
            source: e,
        })?;

        let pages = self.extract_pages(&source, &bytes)?;
        tracing::debug!(source = %source, pages = pages.len(), "PDF text extracted");

        Ok(documents_from_pages(&source, pages))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nao-existe.pdf");

        let err = PdfParser::new().load(&path).unwrap_err();
        assert!(matches!(err, ParserError::IoError { .. }));
    }

    #[test]
    fn test_non_pdf_rejected() {
        let mut file = tempfile::Builder::new().suffix(".pdf").tempfile().unwrap();
        file.write_all(b"just some plain text").unwrap();

        let err = PdfParser::new().load(file.path()).unwrap_err();
        assert!(matches!(err, ParserError::CorruptedFile(_)));
    }

    #[test]
    fn test_documents_from_pages_metadata() {
        let docs = documents_from_pages(
            "docs/manual.pdf",
            vec!["primeira".to_string(), "segunda".to_string()],
        );

        assert_eq!(docs.len(), 2);
        assert_eq!(docs[0].content, "primeira");
        assert_eq!(docs[1].metadata.get("page"), Some(&json!(1)));
        assert_eq!(docs[1].metadata.get("page_label"), Some(&json!("2")));
        assert_eq!(docs[1].metadata.get("total_pages"), Some(&json!(2)));
        assert_eq!(docs[0].metadata.get("source"), Some(&json!("docs/manual.pdf")));
    }

    #[test]
    fn test_empty_page_list() {
        assert!(documents_from_pages("empty.pdf", Vec::new()).is_empty());
    }
}
