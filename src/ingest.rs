//! Ingestion pipeline orchestration.
//!
//! Coordinates the full flow for one PDF: upload slot → text extraction →
//! chunking → embedding → index replacement. The persisted index is only
//! touched after every chunk has been embedded, so any failure along the way
//! leaves a previously ingested document queryable.

use anyhow::{bail, Context, Result};
use std::path::Path;

use crate::chunk::chunk_text;
use crate::config::Config;
use crate::db;
use crate::embedding;
use crate::extract;
use crate::index;
use crate::progress::{IngestEvent, IngestProgress};

/// Outcome of an ingestion run, for callers that render their own summary.
pub struct IngestSummary {
    pub document_id: String,
    pub file_name: String,
    pub char_count: usize,
    pub chunks_written: usize,
}

/// Ingest a PDF from raw bytes, replacing the persisted index.
pub async fn ingest_bytes(
    config: &Config,
    file_name: &str,
    pdf_bytes: &[u8],
    progress: &dyn IngestProgress,
) -> Result<IngestSummary> {
    if !config.embedding.is_enabled() {
        bail!("Embedding provider is disabled. Set [embedding] provider in config.");
    }

    // Persist to the transient upload slot. One document in flight at a time;
    // the previous upload is overwritten.
    if let Some(parent) = config.storage.upload_path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&config.storage.upload_path, pdf_bytes).with_context(|| {
        format!(
            "Failed to write upload slot: {}",
            config.storage.upload_path.display()
        )
    })?;

    progress.report(IngestEvent::Extracting {
        file: file_name.to_string(),
    });
    let text = extract::extract_text(pdf_bytes)?;

    let chunks = chunk_text(&text, &config.chunking);
    if chunks.is_empty() {
        bail!("No chunks produced from {}", file_name);
    }

    let provider = embedding::create_provider(&config.embedding)?;
    let total = chunks.len() as u64;
    let mut vectors: Vec<Vec<f32>> = Vec::with_capacity(chunks.len());

    for batch in chunks.chunks(config.embedding.batch_size) {
        let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
        let batch_vectors =
            embedding::embed_texts(provider.as_ref(), &config.embedding, &texts).await?;
        vectors.extend(batch_vectors);
        progress.report(IngestEvent::Embedding {
            n: vectors.len() as u64,
            total,
        });
    }

    let pool = db::connect(config).await?;
    let document_id = index::replace_index(
        &pool,
        file_name,
        text.chars().count(),
        provider.model_name(),
        provider.dims(),
        &chunks,
        &vectors,
    )
    .await?;
    pool.close().await;

    Ok(IngestSummary {
        document_id,
        file_name: file_name.to_string(),
        char_count: text.chars().count(),
        chunks_written: chunks.len(),
    })
}

/// CLI entry point: read the PDF from disk, ingest it, print a summary.
pub async fn run_ingest(
    config: &Config,
    file: &Path,
    progress: &dyn IngestProgress,
) -> Result<()> {
    let pdf_bytes = std::fs::read(file)
        .with_context(|| format!("Failed to read PDF file: {}", file.display()))?;
    let file_name = file
        .file_name()
        .and_then(|n| n.to_str())
        .unwrap_or("upload.pdf");

    let summary = ingest_bytes(config, file_name, &pdf_bytes, progress).await?;

    println!("ingest {}", summary.file_name);
    println!("  characters extracted: {}", summary.char_count);
    println!("  chunks written: {}", summary.chunks_written);
    println!("  embeddings written: {}", summary.chunks_written);
    println!("  document id: {}", summary.document_id);
    println!("ok");

    Ok(())
}
