//! pdfrag CLI - PDF ingestion
//!
//! Usage:
//!   pdfrag-ingest
//!   pdfrag-ingest --config pdfrag.toml --json-logs
//!
//! Settings come from the environment (and `.env`); a TOML file, when given,
//! supplies defaults that environment variables override. `RUST_LOG`, when
//! set, replaces `logging.level` as the log filter.

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use pdfrag_core::{AppConfig, LoggingConfig};
use pdfrag_rag::IngestionPipeline;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "pdfrag-ingest")]
#[command(about = "Load a PDF, chunk and embed it, and store it in pgvector")]
#[command(version)]
struct Cli {
    /// TOML configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn load_config(path: Option<PathBuf>) -> anyhow::Result<AppConfig> {
    let config = match path {
        Some(path) => AppConfig::from_file(path)?.with_env_override()?,
        None => AppConfig::from_env()?,
    };
    Ok(config)
}

fn init_tracing(logging: &LoggingConfig, json: bool) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(logging.level.as_str()));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json || logging.json_format {
        builder.json().init();
    } else {
        builder.init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = load_config(cli.config)?;
    init_tracing(&config.logging, cli.json_logs);

    let pipeline = IngestionPipeline::from_config(&config).await?;
    let path = config
        .source
        .pdf_path
        .clone()
        .context("PDF_PATH is not set")?;

    tracing::info!(
        path = %path.display(),
        collection = %pipeline.collection_name(),
        "Ingesting PDF"
    );

    println!("adding documents to vector store");
    let report = pipeline.run(&path).await?;
    println!("documents added to vector store");
    tracing::info!(
        chunks = report.chunk_count,
        collection = %report.collection_name,
        "Ingestion complete"
    );

    println!("len ids = {}", report.chunk_count);
    println!("store.collection_name = {}", report.collection_name);

    Ok(())
}
