//! Core data models used throughout pdf-chat.
//!
//! These types represent the chunks, retrieval results, conversation turns,
//! and hosted-model catalog that flow through the ingestion and answer pipeline.

use serde::Serialize;

/// A chunk of extracted document text, the unit of indexing and retrieval.
#[derive(Debug, Clone)]
pub struct Chunk {
    pub id: String,
    pub chunk_index: i64,
    pub text: String,
    /// SHA-256 of `text`, used for embedding staleness detection.
    pub hash: String,
}

/// A chunk returned from the vector index for a query, with its similarity score.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk_index: i64,
    pub text: String,
    pub score: f64,
}

/// Speaker role in the conversation log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One entry in the append-only conversation log.
#[derive(Debug, Clone, Serialize)]
pub struct Turn {
    pub role: Role,
    pub content: String,
}

/// A hosted chat model available for answer generation.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ModelSpec {
    /// API identifier sent in completion requests.
    pub id: &'static str,
    /// Human-readable display name.
    pub name: &'static str,
    /// Published token ceiling for this model.
    pub max_tokens: u32,
    /// Model developer label.
    pub developer: &'static str,
}

/// Static catalog of hosted models. Selection is per-session; the catalog
/// itself is immutable.
pub const MODEL_CATALOG: &[ModelSpec] = &[
    ModelSpec {
        id: "mixtral-8x7b-32768",
        name: "Mixtral-8x7b-Instruct-v0.1",
        max_tokens: 32768,
        developer: "Mistral",
    },
    ModelSpec {
        id: "llama3-8b-8192",
        name: "LLaMA3-8b-8192",
        max_tokens: 8192,
        developer: "Meta",
    },
    ModelSpec {
        id: "gemma2-9b-it",
        name: "gemma2-9b-it",
        max_tokens: 8192,
        developer: "Google",
    },
    ModelSpec {
        id: "deepseek-r1-distill-llama-70b",
        name: "deepseek-r1-distill-llama-70b",
        max_tokens: 16384,
        developer: "Deepseek",
    },
];

/// Smallest selectable completion budget.
pub const MIN_COMPLETION_TOKENS: u32 = 512;
/// Default completion budget when none is chosen.
pub const DEFAULT_COMPLETION_TOKENS: u32 = 1024;
/// Granularity of the token-budget control on interactive surfaces.
pub const COMPLETION_TOKEN_STEP: u32 = 512;

/// Look up a model by its API identifier.
pub fn find_model(id: &str) -> Option<&'static ModelSpec> {
    MODEL_CATALOG.iter().find(|m| m.id == id)
}

/// Clamp a requested completion budget into `[MIN_COMPLETION_TOKENS, model ceiling]`.
pub fn clamp_completion_tokens(model: &ModelSpec, requested: u32) -> u32 {
    requested.clamp(MIN_COMPLETION_TOKENS, model.max_tokens)
}
