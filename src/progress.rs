//! Ingest progress reporting.
//!
//! Reports observable progress during `pdfchat ingest` so users see which
//! phase the pipeline is in and how much embedding work remains. Progress is
//! emitted on **stderr** so stdout remains parseable for scripts.

use std::io::Write;

/// A single progress event for an ingestion run.
#[derive(Clone, Debug)]
pub enum IngestEvent {
    /// Extracting text from the uploaded PDF.
    Extracting { file: String },
    /// Embedding chunks: n done out of total.
    Embedding { n: u64, total: u64 },
}

/// Reports ingest progress. Implementations write to stderr.
pub trait IngestProgress: Send + Sync {
    fn report(&self, event: IngestEvent);
}

/// Human-friendly progress on stderr: "ingest report.pdf  embedding  40 / 120 chunks".
pub struct StderrProgress;

impl IngestProgress for StderrProgress {
    fn report(&self, event: IngestEvent) {
        let line = match &event {
            IngestEvent::Extracting { file } => format!("ingest {}  extracting...\n", file),
            IngestEvent::Embedding { n, total } => {
                format!("ingest  embedding  {} / {} chunks\n", n, total)
            }
        };
        let _ = std::io::stderr().lock().write_all(line.as_bytes());
        let _ = std::io::stderr().lock().flush();
    }
}

/// No-op reporter when progress is disabled.
pub struct NoProgress;

impl IngestProgress for NoProgress {
    fn report(&self, _event: IngestEvent) {}
}

/// Default: human progress when stderr is a TTY, otherwise off.
pub fn default_reporter() -> Box<dyn IngestProgress> {
    if atty::is(atty::Stream::Stderr) {
        Box::new(StderrProgress)
    } else {
        Box::new(NoProgress)
    }
}
