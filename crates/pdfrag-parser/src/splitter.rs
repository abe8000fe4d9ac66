//! Recursive character text splitter
//!
//! Splits text on the coarsest separator present (paragraphs, then lines,
//! then words), merges the pieces back into chunks of at most `chunk_size`
//! characters, and carries up to `chunk_overlap` characters of each chunk's
//! tail into the next one. Pieces that are still too long after the last
//! separator are emitted whole.
//!
//! Lengths are counted in characters, not bytes.

use std::collections::VecDeque;

use thiserror::Error;

use crate::{Document, TextChunk};

/// Separators tried in order, coarsest first
pub const DEFAULT_SEPARATORS: [&str; 3] = ["\n\n", "\n", " "];

/// Invalid splitter parameters
#[derive(Error, Debug, PartialEq, Eq)]
pub enum SplitterError {
    #[error("chunk size must be greater than zero")]
    ZeroChunkSize,

    #[error("chunk overlap ({overlap}) is larger than chunk size ({size})")]
    OverlapTooLarge { overlap: usize, size: usize },
}

/// Size-bounded recursive splitter
#[derive(Debug, Clone)]
pub struct RecursiveCharacterSplitter {
    chunk_size: usize,
    chunk_overlap: usize,
    separators: Vec<String>,
}

impl RecursiveCharacterSplitter {
    /// Create a splitter with the default separators
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self, SplitterError> {
        if chunk_size == 0 {
            return Err(SplitterError::ZeroChunkSize);
        }
        if chunk_overlap > chunk_size {
            return Err(SplitterError::OverlapTooLarge {
                overlap: chunk_overlap,
                size: chunk_size,
            });
        }

        Ok(Self {
            chunk_size,
            chunk_overlap,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        })
    }

    /// Replace the separator list.
    ///
    /// An empty separator splits into single characters, so no chunk can
    /// exceed `chunk_size`.
    pub fn with_separators(mut self, separators: Vec<String>) -> Self {
        self.separators = separators;
        self
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn chunk_overlap(&self) -> usize {
        self.chunk_overlap
    }

    /// Split every document, keeping document order then chunk order.
    /// Each chunk inherits a copy of its document's metadata.
    pub fn split_documents(&self, documents: &[Document]) -> Vec<TextChunk> {
        documents
            .iter()
            .flat_map(|doc| {
                self.split_text(&doc.content)
                    .into_iter()
                    .map(|content| TextChunk {
                        content,
                        metadata: doc.metadata.clone(),
                    })
            })
            .collect()
    }

    /// Split a single text into chunks
    pub fn split_text(&self, text: &str) -> Vec<String> {
        self.split_recursive(text, &self.separators)
    }

    fn split_recursive(&self, text: &str, separators: &[String]) -> Vec<String> {
        let mut chunks = Vec::new();
        let (separator, fallbacks) = choose_separator(text, separators);

        let mut small: Vec<&str> = Vec::new();
        for piece in split_keeping_separator(text, separator) {
            if char_len(piece) < self.chunk_size {
                small.push(piece);
                continue;
            }

            if !small.is_empty() {
                chunks.extend(self.merge_pieces(&small));
                small.clear();
            }

            if fallbacks.is_empty() {
                // Nothing finer to split on: the piece becomes its own chunk
                let trimmed = piece.trim();
                tracing::warn!(
                    chunk_len = char_len(trimmed),
                    chunk_size = self.chunk_size,
                    "created a chunk longer than the configured size"
                );
                if !trimmed.is_empty() {
                    chunks.push(trimmed.to_string());
                }
            } else {
                chunks.extend(self.split_recursive(piece, fallbacks));
            }
        }

        if !small.is_empty() {
            chunks.extend(self.merge_pieces(&small));
        }

        chunks
    }

    /// Greedily pack pieces into chunks, retaining an overlapping tail
    fn merge_pieces(&self, pieces: &[&str]) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: VecDeque<(&str, usize)> = VecDeque::new();
        let mut total = 0usize;

        for &piece in pieces {
            let len = char_len(piece);

            if total + len > self.chunk_size {
                if total > self.chunk_size {
                    tracing::warn!(
                        chunk_len = total,
                        chunk_size = self.chunk_size,
                        "created a chunk longer than the configured size"
                    );
                }

                if !current.is_empty() {
                    if let Some(chunk) = join_pieces(&current) {
                        chunks.push(chunk);
                    }

                    while total > self.chunk_overlap || (total + len > self.chunk_size && total > 0)
                    {
                        match current.pop_front() {
                            Some((_, front_len)) => total -= front_len,
                            None => break,
                        }
                    }
                }
            }

            current.push_back((piece, len));
            total += len;
        }

        if let Some(chunk) = join_pieces(&current) {
            chunks.push(chunk);
        }

        chunks
    }
}

impl Default for RecursiveCharacterSplitter {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 150,
            separators: DEFAULT_SEPARATORS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

/// Pick the first separator that occurs in `text`, returning it together
/// with the finer separators left for oversized pieces
fn choose_separator<'a>(text: &str, separators: &'a [String]) -> (&'a str, &'a [String]) {
    for (i, separator) in separators.iter().enumerate() {
        if separator.is_empty() {
            return (separator.as_str(), &[]);
        }
        if text.contains(separator.as_str()) {
            return (separator.as_str(), &separators[i + 1..]);
        }
    }

    match separators.last() {
        Some(last) => (last.as_str(), &[]),
        None => ("", &[]),
    }
}

/// Split on `separator`, attaching each separator to the start of the piece
/// that follows it. Empty pieces are dropped.
fn split_keeping_separator<'t>(text: &'t str, separator: &str) -> Vec<&'t str> {
    if separator.is_empty() {
        return text
            .char_indices()
            .map(|(i, c)| &text[i..i + c.len_utf8()])
            .collect();
    }

    let mut pieces = Vec::new();
    let mut start = 0;
    for (pos, _) in text.match_indices(separator) {
        if pos > start {
            pieces.push(&text[start..pos]);
        }
        start = pos;
    }
    if start < text.len() {
        pieces.push(&text[start..]);
    }

    pieces
}

fn join_pieces(pieces: &VecDeque<(&str, usize)>) -> Option<String> {
    let joined: String = pieces.iter().map(|(piece, _)| *piece).collect();
    let trimmed = joined.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn words(count: usize) -> String {
        (0..count)
            .map(|i| format!("word{i}"))
            .collect::<Vec<_>>()
            .join(" ")
    }

    #[test]
    fn test_rejects_invalid_parameters() {
        assert_eq!(
            RecursiveCharacterSplitter::new(0, 0).unwrap_err(),
            SplitterError::ZeroChunkSize
        );
        assert_eq!(
            RecursiveCharacterSplitter::new(100, 150).unwrap_err(),
            SplitterError::OverlapTooLarge {
                overlap: 150,
                size: 100
            }
        );
    }

    #[test]
    fn test_default_parameters() {
        let splitter = RecursiveCharacterSplitter::default();
        assert_eq!(splitter.chunk_size(), 1000);
        assert_eq!(splitter.chunk_overlap(), 150);

        let custom = RecursiveCharacterSplitter::new(200, 200).unwrap();
        assert_eq!(custom.chunk_size(), 200);
        assert_eq!(custom.chunk_overlap(), 200);
    }

    #[test]
    fn test_short_text_is_single_chunk() {
        let splitter = RecursiveCharacterSplitter::default();
        let chunks = splitter.split_text("  Uma frase curta.  ");
        assert_eq!(chunks, vec!["Uma frase curta."]);
    }

    #[test]
    fn test_empty_text_yields_nothing() {
        let splitter = RecursiveCharacterSplitter::default();
        assert!(splitter.split_text("").is_empty());
        assert!(splitter.split_text(" \n\n \n").is_empty());
    }

    #[test]
    fn test_word_packing_with_overlap() {
        let splitter = RecursiveCharacterSplitter::new(10, 0).unwrap();
        let chunks = splitter.split_text("one two three four five six");
        assert_eq!(chunks, vec!["one two", "three", "four five", "six"]);

        let splitter = RecursiveCharacterSplitter::new(10, 5).unwrap();
        let chunks = splitter.split_text("one two three four five six");
        assert_eq!(chunks, vec!["one two", "two three", "four five", "five six"]);
    }

    #[test]
    fn test_paragraphs_preferred_over_words() {
        let first = "a".repeat(30);
        let second = "b".repeat(30);
        let text = format!("{first} x\n\n{second} y");

        let splitter = RecursiveCharacterSplitter::new(40, 0).unwrap();
        let chunks = splitter.split_text(&text);
        assert_eq!(chunks, vec![format!("{first} x"), format!("{second} y")]);
    }

    #[test]
    fn test_oversized_token_emitted_whole() {
        let token = "x".repeat(1500);
        let text = format!("alpha beta {token} omega");

        let splitter = RecursiveCharacterSplitter::default();
        let chunks = splitter.split_text(&text);
        assert_eq!(chunks, vec!["alpha beta".to_string(), token, "omega".to_string()]);
    }

    #[test]
    fn test_empty_separator_bounds_every_chunk() {
        let token = "x".repeat(25);
        let splitter = RecursiveCharacterSplitter::new(10, 2)
            .unwrap()
            .with_separators(vec![" ".to_string(), String::new()]);

        let chunks = splitter.split_text(&token);
        assert!(chunks.len() > 2);
        assert!(chunks.iter().all(|c| c.chars().count() <= 10));
    }

    #[test]
    fn test_counts_characters_not_bytes() {
        let text = "ação ".repeat(300);
        let splitter = RecursiveCharacterSplitter::default();
        let chunks = splitter.split_text(&text);

        assert!(chunks.len() >= 2);
        for chunk in &chunks {
            assert!(chunk.chars().count() <= 1000);
        }
    }

    #[test]
    fn test_three_pages_of_2500_chars() {
        let page = words(400).chars().take(2500).collect::<String>();
        assert_eq!(page.chars().count(), 2500);

        let docs: Vec<Document> = (0..3)
            .map(|i| Document::new(page.clone()).with_metadata("page", i))
            .collect();

        let splitter = RecursiveCharacterSplitter::default();
        let chunks = splitter.split_documents(&docs);

        for page_no in 0..3 {
            let page_chunks: Vec<_> = chunks
                .iter()
                .filter(|c| c.metadata.get("page") == Some(&serde_json::json!(page_no)))
                .collect();
            assert!(page_chunks.len() >= 3);

            for pair in page_chunks.windows(2) {
                let head: String = pair[1].content.chars().take(20).collect();
                assert!(pair[0].content.contains(&head), "consecutive chunks overlap");
            }
        }

        assert!(chunks.iter().all(|c| c.content.chars().count() <= 1000));
    }

    #[test]
    fn test_document_order_preserved() {
        let docs = vec![
            Document::new(format!("first {}", words(300))).with_metadata("page", 0),
            Document::new(format!("second {}", words(300))).with_metadata("page", 1),
        ];

        let chunks = RecursiveCharacterSplitter::default().split_documents(&docs);
        let pages: Vec<_> = chunks
            .iter()
            .map(|c| c.metadata["page"].as_u64().unwrap())
            .collect();

        let mut sorted = pages.clone();
        sorted.sort();
        assert_eq!(pages, sorted);
        assert!(chunks[0].content.starts_with("first"));
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        #[test]
        fn prop_split_is_deterministic(text in "[a-z]{1,8}( [a-z]{1,8}| ?\n[a-z]{1,8}){0,300}") {
            let splitter = RecursiveCharacterSplitter::new(120, 30).unwrap();
            prop_assert_eq!(splitter.split_text(&text), splitter.split_text(&text));
        }

        #[test]
        fn prop_chunks_bounded_and_non_empty(
            text in "[a-z]{1,8}( [a-z]{1,8}){0,300}",
            size in 20usize..200,
            overlap in 0usize..20,
        ) {
            let splitter = RecursiveCharacterSplitter::new(size, overlap).unwrap();
            for chunk in splitter.split_text(&text) {
                prop_assert!(!chunk.is_empty());
                prop_assert!(chunk.chars().count() <= size);
            }
        }

        #[test]
        fn prop_no_word_is_lost(text in "[a-z]{1,8}( [a-z]{1,8}){0,200}") {
            let splitter = RecursiveCharacterSplitter::new(50, 10).unwrap();
            let joined = splitter.split_text(&text).join(" ");
            for word in text.split(' ') {
                prop_assert!(joined.contains(word));
            }
        }
    }
}
