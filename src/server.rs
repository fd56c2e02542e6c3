//! HTTP server exposing the pipeline over JSON.
//!
//! # Endpoints
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `POST` | `/ingest` | Upload a PDF (raw body) and rebuild the index |
//! | `POST` | `/ask` | Answer a question against the indexed document |
//! | `GET`  | `/history` | Conversation history, oldest first |
//! | `GET`  | `/models` | Chat model catalog |
//! | `GET`  | `/status` | Indexed document summary |
//! | `GET`  | `/health` | Health check (returns version) |
//!
//! # Error Contract
//!
//! Error responses share one envelope:
//!
//! ```json
//! { "error": { "code": "bad_request", "message": "question must not be empty" } }
//! ```
//!
//! Error codes: `bad_request` (400), `not_ready` (400), `ingest_failed` (422),
//! `internal` (500).
//!
//! Chat completion failures are NOT errors at this surface: `/ask` reports
//! them inside the answer (`"Error: ..."`) and records the exchange, so a
//! flaky upstream never breaks the conversation.
//!
//! # CORS
//!
//! All origins, methods, and headers are permitted to support browser-based
//! clients.

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::sync::{Mutex, RwLock};
use tower_http::cors::{Any, CorsLayer};

use crate::ask::NOT_READY;
use crate::chat;
use crate::config::Config;
use crate::db;
use crate::index::VectorIndex;
use crate::ingest;
use crate::models::{self, Turn};
use crate::progress::NoProgress;
use crate::session::Session;

/// Shared application state passed to all route handlers via Axum's `State` extractor.
#[derive(Clone)]
struct AppState {
    config: Arc<Config>,
    api_key: Arc<String>,
    /// Loaded once at startup, swapped atomically after each ingestion.
    /// Handlers clone the inner `Arc` and drop the guard before awaiting
    /// network calls, so an index swap never waits on a slow upstream.
    index: Arc<RwLock<Option<Arc<VectorIndex>>>>,
    /// Append-only conversation history for this server's lifetime.
    session: Arc<Mutex<Session>>,
}

/// Starts the HTTP server.
///
/// Loads any persisted index before accepting requests, binds to the address
/// configured in `[server].bind`, and runs until the process is terminated.
/// Fails fast when the chat API key is missing.
pub async fn run_server(config: &Config) -> anyhow::Result<()> {
    let api_key = chat::require_api_key()?;
    let bind_addr = config.server.bind.clone();

    let pool = db::connect(config).await?;
    let index = VectorIndex::load(&pool).await?;
    pool.close().await;

    match &index {
        Some(index) => println!(
            "index loaded: {} ({} chunks)",
            index.document.file_name,
            index.len()
        ),
        None => println!("no document indexed yet"),
    }

    let state = AppState {
        config: Arc::new(config.clone()),
        api_key: Arc::new(api_key),
        index: Arc::new(RwLock::new(index.map(Arc::new))),
        session: Arc::new(Mutex::new(Session::new())),
    };

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let app = Router::new()
        .route("/ingest", post(handle_ingest))
        .route("/ask", post(handle_ask))
        .route("/history", get(handle_history))
        .route("/models", get(handle_models))
        .route("/status", get(handle_status))
        .route("/health", get(handle_health))
        .layer(cors)
        .with_state(state);

    println!("server listening on http://{}", bind_addr);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

// ============ Error response ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    /// Machine-readable error code (e.g., `"bad_request"`, `"not_ready"`).
    code: String,
    /// Human-readable error message.
    message: String,
}

/// Internal error type that converts into an Axum HTTP response.
struct AppError {
    status: StatusCode,
    code: String,
    message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

fn bad_request(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "bad_request".to_string(),
        message: message.into(),
    }
}

/// 400 with a distinct code so clients can prompt for an upload.
fn not_ready() -> AppError {
    AppError {
        status: StatusCode::BAD_REQUEST,
        code: "not_ready".to_string(),
        message: NOT_READY.to_string(),
    }
}

/// 422 for ingestion failures (unreadable PDF, no extractable text).
fn ingest_failed(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::UNPROCESSABLE_ENTITY,
        code: "ingest_failed".to_string(),
        message: message.into(),
    }
}

fn internal(message: impl Into<String>) -> AppError {
    AppError {
        status: StatusCode::INTERNAL_SERVER_ERROR,
        code: "internal".to_string(),
        message: message.into(),
    }
}

// ============ GET /health ============

#[derive(Serialize)]
struct HealthResponse {
    status: String,
    version: String,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ============ POST /ingest ============

#[derive(Deserialize)]
struct IngestQuery {
    /// Display name for the uploaded document.
    #[serde(default)]
    file_name: Option<String>,
}

#[derive(Serialize)]
struct IngestResponse {
    document_id: String,
    file_name: String,
    char_count: usize,
    chunks: usize,
}

/// Handler for `POST /ingest`. The request body is the raw PDF bytes.
///
/// On success the in-memory index is swapped for the new document. On
/// failure the previous index (if any) remains queryable.
async fn handle_ingest(
    State(state): State<AppState>,
    Query(query): Query<IngestQuery>,
    body: Bytes,
) -> Result<Json<IngestResponse>, AppError> {
    if body.is_empty() {
        return Err(bad_request("request body must contain a PDF"));
    }
    let file_name = query.file_name.unwrap_or_else(|| "upload.pdf".to_string());

    let summary = ingest::ingest_bytes(&state.config, &file_name, &body, &NoProgress)
        .await
        .map_err(|e| ingest_failed(e.to_string()))?;

    let pool = db::connect(&state.config).await.map_err(|e| internal(e.to_string()))?;
    let reloaded = VectorIndex::load(&pool).await.map_err(|e| internal(e.to_string()))?;
    pool.close().await;
    *state.index.write().await = reloaded.map(Arc::new);

    Ok(Json(IngestResponse {
        document_id: summary.document_id,
        file_name: summary.file_name,
        char_count: summary.char_count,
        chunks: summary.chunks_written,
    }))
}

// ============ POST /ask ============

#[derive(Deserialize)]
struct AskRequest {
    question: String,
    /// Chat model id; defaults to `[chat].default_model`.
    #[serde(default)]
    model: Option<String>,
    /// Completion token budget; defaults to `[chat].default_max_tokens`.
    #[serde(default)]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct AskResponse {
    answer: String,
    chunks: Vec<models::RetrievedChunk>,
}

/// Handler for `POST /ask`.
///
/// Validation failures (empty question, unknown model, nothing ingested) are
/// rejected without touching the history. Once a question is accepted, the
/// exchange is always recorded, including `Error: ...` answers.
async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<AskRequest>,
) -> Result<Json<AskResponse>, AppError> {
    let question = request.question.trim().to_string();
    if question.is_empty() {
        return Err(bad_request("question must not be empty"));
    }

    let model_id = request
        .model
        .unwrap_or_else(|| state.config.chat.default_model.clone());
    if models::find_model(&model_id).is_none() {
        return Err(bad_request(format!("unknown chat model: {}", model_id)));
    }
    let max_tokens = request
        .max_tokens
        .unwrap_or(state.config.chat.default_max_tokens);

    // Clone the index handle and release the lock before the embed and
    // completion round trips; a concurrent ingest swaps the index freely.
    let index = {
        let guard = state.index.read().await;
        guard.as_ref().cloned().ok_or_else(not_ready)?
    };

    let answer = chat::answer_question(
        &state.config,
        &index,
        &state.api_key,
        &question,
        &model_id,
        max_tokens,
    )
    .await;

    state
        .session
        .lock()
        .await
        .record_exchange(&question, &answer.text);

    Ok(Json(AskResponse {
        answer: answer.text,
        chunks: answer.chunks,
    }))
}

// ============ GET /history ============

#[derive(Serialize)]
struct HistoryResponse {
    turns: Vec<Turn>,
}

async fn handle_history(State(state): State<AppState>) -> Json<HistoryResponse> {
    let session = state.session.lock().await;
    Json(HistoryResponse {
        turns: session.turns().to_vec(),
    })
}

// ============ GET /models ============

#[derive(Serialize)]
struct ModelsResponse {
    models: Vec<ModelInfo>,
}

#[derive(Serialize)]
struct ModelInfo {
    id: String,
    name: String,
    developer: String,
    max_tokens: u32,
}

async fn handle_models() -> Json<ModelsResponse> {
    Json(ModelsResponse {
        models: models::MODEL_CATALOG
            .iter()
            .map(|m| ModelInfo {
                id: m.id.to_string(),
                name: m.name.to_string(),
                developer: m.developer.to_string(),
                max_tokens: m.max_tokens,
            })
            .collect(),
    })
}

// ============ GET /status ============

#[derive(Serialize)]
struct StatusResponse {
    indexed: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    file_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    chunks: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    embedding_model: Option<String>,
}

async fn handle_status(State(state): State<AppState>) -> Json<StatusResponse> {
    let index = state.index.read().await;
    match index.as_ref() {
        Some(index) => Json(StatusResponse {
            indexed: true,
            file_name: Some(index.document.file_name.clone()),
            chunks: Some(index.len()),
            embedding_model: Some(index.model.clone()),
        }),
        None => Json(StatusResponse {
            indexed: false,
            file_name: None,
            chunks: None,
            embedding_model: None,
        }),
    }
}
