//! CLI integration tests that exercise the `pdfchat` binary end to end
//! without any network access.

use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_pdfchat");

/// Write a config pointing all storage into `dir`, with embeddings disabled
/// so no provider is contacted.
fn write_config(dir: &Path) -> std::path::PathBuf {
    let config_path = dir.join("pdfchat.toml");
    let contents = format!(
        r#"
[storage]
db_path = "{dir}/pdfchat.sqlite"
upload_path = "{dir}/upload.pdf"

[embedding]
provider = "disabled"
"#,
        dir = dir.display()
    );
    std::fs::write(&config_path, contents).unwrap();
    config_path
}

fn run(config: &Path, args: &[&str]) -> Output {
    Command::new(BIN)
        .arg("--config")
        .arg(config)
        .args(args)
        .env("GROQ_API_KEY", "test-key")
        .output()
        .expect("failed to run pdfchat")
}

fn stdout(output: &Output) -> String {
    String::from_utf8_lossy(&output.stdout).to_string()
}

fn stderr(output: &Output) -> String {
    String::from_utf8_lossy(&output.stderr).to_string()
}

#[test]
fn init_is_idempotent() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let first = run(&config, &["init"]);
    assert!(first.status.success(), "init failed: {}", stderr(&first));
    assert!(dir.path().join("pdfchat.sqlite").exists());

    let second = run(&config, &["init"]);
    assert!(second.status.success(), "re-init failed: {}", stderr(&second));
}

#[test]
fn models_lists_the_catalog() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    let output = run(&config, &["models"]);
    assert!(output.status.success());
    let out = stdout(&output);
    for id in [
        "mixtral-8x7b-32768",
        "llama3-8b-8192",
        "gemma2-9b-it",
        "deepseek-r1-distill-llama-70b",
    ] {
        assert!(out.contains(id), "missing model {} in:\n{}", id, out);
    }
}

#[test]
fn status_reports_nothing_ingested() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    run(&config, &["init"]);
    let output = run(&config, &["status"]);
    assert!(output.status.success(), "status failed: {}", stderr(&output));
    assert!(stdout(&output).contains("none ingested"));
}

#[test]
fn ask_before_ingest_prints_notice() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());

    run(&config, &["init"]);
    let output = run(&config, &["ask", "What is this about?"]);
    assert!(output.status.success(), "ask failed: {}", stderr(&output));
    assert!(stdout(&output).contains("No document ingested yet"));
}

#[test]
fn ask_requires_api_key() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    run(&config, &["init"]);

    let output = Command::new(BIN)
        .arg("--config")
        .arg(&config)
        .args(["ask", "anything"])
        .env_remove("GROQ_API_KEY")
        .output()
        .expect("failed to run pdfchat");

    assert!(!output.status.success());
    assert!(stderr(&output).contains("GROQ_API_KEY"));
}

#[test]
fn ask_rejects_unknown_model() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    run(&config, &["init"]);

    let output = run(&config, &["ask", "anything", "--model", "gpt-9000"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Unknown chat model"));
}

#[test]
fn ingest_fails_when_embeddings_disabled() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    run(&config, &["init"]);

    let pdf_path = dir.path().join("doc.pdf");
    std::fs::write(&pdf_path, b"%PDF-1.4 not really").unwrap();

    let output = run(&config, &["ingest", pdf_path.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("disabled"));
}

#[test]
fn ingest_rejects_unreadable_pdf() {
    let dir = TempDir::new().unwrap();
    let config_path = dir.path().join("pdfchat.toml");
    // Remote provider config so ingestion gets past the enabled check; the
    // PDF is rejected before any embedding request is made.
    let contents = format!(
        r#"
[storage]
db_path = "{dir}/pdfchat.sqlite"
upload_path = "{dir}/upload.pdf"

[embedding]
provider = "ollama"
model = "mock-embed"
dims = 8
max_retries = 0
timeout_secs = 2
url = "http://127.0.0.1:9"
"#,
        dir = dir.path().display()
    );
    std::fs::write(&config_path, contents).unwrap();
    run(&config_path, &["init"]);

    let pdf_path = dir.path().join("garbage.pdf");
    std::fs::write(&pdf_path, b"this is not a pdf at all").unwrap();

    let output = run(&config_path, &["ingest", pdf_path.to_str().unwrap()]);
    assert!(!output.status.success());
}

#[test]
fn ingest_reports_missing_file() {
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path());
    run(&config, &["init"]);

    let output = run(&config, &["ingest", "/nonexistent/report.pdf"]);
    assert!(!output.status.success());
    assert!(stderr(&output).contains("Failed to read PDF file"));
}
