//! pdfrag RAG - Ingestion and question-answering pipelines
//!
//! This crate wires the loader, splitter, embedding client and vector store
//! into the two pipelines:
//! - Ingestion: PDF → chunks → embeddings → vector collection
//! - Search: question → nearest chunks → grounded prompt → chat model
//!
//! Author: hephaex@gmail.com

pub mod ingest;
pub mod llm;
pub mod prompt;
pub mod search;

pub use ingest::{assign_ids, ingest, IngestionPipeline, IngestionReport};
pub use llm::OpenAiClient;
pub use prompt::{render_search_prompt, PromptTemplate, PROMPT_TEMPLATE, REFUSAL_SENTENCE};
pub use search::{assemble_context, parse_output, search_prompt, SearchPipeline};
