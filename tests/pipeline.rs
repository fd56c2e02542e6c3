//! End-to-end pipeline tests: ingest a real (tiny) PDF and answer questions
//! against a mock embedding + chat API served on localhost.
//!
//! The mock embedder produces deterministic bag-of-words vectors, so chunks
//! sharing words with the question score highest. The mock chat endpoint
//! echoes the prompt it received inside a `<think>` wrapper, which lets tests
//! observe both the retrieved context and the think-stripping behavior from
//! the outside.

use axum::{routing::post, Json, Router};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, Stream};
use serde_json::{json, Value};
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use tempfile::TempDir;

const BIN: &str = env!("CARGO_BIN_EXE_pdfchat");

// ============ Mock API ============

fn bucket(word: &str) -> usize {
    word.bytes()
        .fold(0usize, |acc, b| acc.wrapping_mul(31).wrapping_add(b as usize))
        % 8
}

fn mock_vector(text: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 8];
    for word in text
        .to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
    {
        v[bucket(word)] += 1.0;
    }
    if v.iter().all(|&x| x == 0.0) {
        v[0] = 1.0;
    }
    v
}

async fn mock_embed(Json(body): Json<Value>) -> Json<Value> {
    let inputs = body["input"].as_array().cloned().unwrap_or_default();
    let embeddings: Vec<Value> = inputs
        .iter()
        .map(|t| json!(mock_vector(t.as_str().unwrap_or(""))))
        .collect();
    Json(json!({ "embeddings": embeddings }))
}

async fn mock_chat(Json(body): Json<Value>) -> Json<Value> {
    let prompt = body["messages"][0]["content"].as_str().unwrap_or("");
    let content = format!("<think>\nconsulting the context\n</think>\n{}", prompt);
    Json(json!({
        "choices": [{ "message": { "role": "assistant", "content": content } }]
    }))
}

/// Start the mock API on a background thread; returns its base URL.
fn spawn_mock_api() -> String {
    let (tx, rx) = std::sync::mpsc::channel::<SocketAddr>();
    std::thread::spawn(move || {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async move {
            let app = Router::new()
                .route("/api/embed", post(mock_embed))
                .route("/chat/completions", post(mock_chat));
            let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
            tx.send(listener.local_addr().unwrap()).unwrap();
            axum::serve(listener, app).await.unwrap();
        });
    });
    format!("http://{}", rx.recv().unwrap())
}

/// An address nothing is listening on.
fn closed_port_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("http://{}", addr)
}

// ============ Fixtures ============

/// Build a one-page PDF containing `text` on a single line.
fn make_pdf(text: &str) -> Vec<u8> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! { "F1" => font_id },
    });
    let content = Content {
        operations: vec![
            Operation::new("BT", vec![]),
            Operation::new("Tf", vec!["F1".into(), 12.into()]),
            Operation::new("Td", vec![72.into(), 700.into()]),
            Operation::new("Tj", vec![Object::string_literal(text)]),
            Operation::new("ET", vec![]),
        ],
    };
    let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode().unwrap()));
    let page_id = doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
        "Resources" => resources_id,
        "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
    });
    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => vec![page_id.into()],
            "Count" => 1,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf).unwrap();
    buf
}

fn write_config(dir: &Path, embed_url: &str, chat_url: &str) -> PathBuf {
    let config_path = dir.join("pdfchat.toml");
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
timeout_secs = 5
url = "{embed_url}"

[chat]
api_url = "{chat_url}"
timeout_secs = 5
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

// ============ Tests ============

#[test]
fn ingest_then_ask_grounds_the_answer() {
    let api = spawn_mock_api();
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &api, &api);

    let pdf_path = dir.path().join("france.pdf");
    std::fs::write(&pdf_path, make_pdf("The capital of France is Paris.")).unwrap();

    let ingest = run(&config, &["ingest", pdf_path.to_str().unwrap()]);
    assert!(ingest.status.success(), "ingest failed: {}", stderr(&ingest));
    let out = stdout(&ingest);
    assert!(out.contains("chunks written"), "unexpected summary:\n{}", out);
    assert!(out.contains("ok"));

    let ask = run(&config, &["ask", "What is the capital of France?"]);
    assert!(ask.status.success(), "ask failed: {}", stderr(&ask));
    let answer = stdout(&ask);
    // The mock echoes the prompt, so the retrieved chunk text is visible.
    assert!(answer.contains("Paris"), "answer not grounded:\n{}", answer);
    assert!(answer.contains("Question: What is the capital of France?"));
    // Reasoning spans are stripped before the answer is shown.
    assert!(!answer.contains("<think>"), "think tag leaked:\n{}", answer);
}

#[test]
fn ingest_records_status() {
    let api = spawn_mock_api();
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &api, &api);

    let pdf_path = dir.path().join("report.pdf");
    std::fs::write(&pdf_path, make_pdf("Quarterly revenue grew by ten percent.")).unwrap();
    let ingest = run(&config, &["ingest", pdf_path.to_str().unwrap()]);
    assert!(ingest.status.success(), "ingest failed: {}", stderr(&ingest));

    let status = run(&config, &["status"]);
    assert!(status.status.success());
    let out = stdout(&status);
    assert!(out.contains("report.pdf"), "status missing file:\n{}", out);
    assert!(out.contains("embedding model: mock-embed"));
}

#[test]
fn reingest_replaces_the_previous_document() {
    let api = spawn_mock_api();
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &api, &api);

    let first = dir.path().join("first.pdf");
    std::fs::write(&first, make_pdf("The capital of France is Paris.")).unwrap();
    assert!(run(&config, &["ingest", first.to_str().unwrap()]).status.success());

    let second = dir.path().join("second.pdf");
    std::fs::write(&second, make_pdf("The tallest mountain is Everest.")).unwrap();
    assert!(run(&config, &["ingest", second.to_str().unwrap()]).status.success());

    let status = run(&config, &["status"]);
    let out = stdout(&status);
    assert!(out.contains("second.pdf"), "old document survived:\n{}", out);
    assert!(!out.contains("first.pdf"));

    // Only the new document's chunks can appear in the context.
    let ask = run(&config, &["ask", "What is the tallest mountain?"]);
    let answer = stdout(&ask);
    assert!(answer.contains("Everest"), "answer not grounded:\n{}", answer);
    assert!(!answer.contains("Paris"), "stale context leaked:\n{}", answer);
}

#[test]
fn chat_failures_become_error_answers() {
    let api = spawn_mock_api();
    let dir = TempDir::new().unwrap();
    // Embeddings work; the chat endpoint is unreachable.
    let config = write_config(dir.path(), &api, &closed_port_url());

    let pdf_path = dir.path().join("doc.pdf");
    std::fs::write(&pdf_path, make_pdf("The capital of France is Paris.")).unwrap();
    assert!(run(&config, &["ingest", pdf_path.to_str().unwrap()]).status.success());

    let ask = run(&config, &["ask", "What is the capital of France?"]);
    assert!(ask.status.success(), "ask should fail soft: {}", stderr(&ask));
    assert!(
        stdout(&ask).starts_with("Error:"),
        "expected Error: answer, got:\n{}",
        stdout(&ask)
    );
}

#[test]
fn failed_reingest_keeps_the_previous_index() {
    let api = spawn_mock_api();
    let dir = TempDir::new().unwrap();
    let config = write_config(dir.path(), &api, &api);

    let good = dir.path().join("good.pdf");
    std::fs::write(&good, make_pdf("The capital of France is Paris.")).unwrap();
    assert!(run(&config, &["ingest", good.to_str().unwrap()]).status.success());

    let bad = dir.path().join("bad.pdf");
    std::fs::write(&bad, b"not a pdf").unwrap();
    let ingest = run(&config, &["ingest", bad.to_str().unwrap()]);
    assert!(!ingest.status.success());

    // The earlier document is still queryable.
    let status = run(&config, &["status"]);
    assert!(stdout(&status).contains("good.pdf"));
    let ask = run(&config, &["ask", "What is the capital of France?"]);
    assert!(stdout(&ask).contains("Paris"));
}
