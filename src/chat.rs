//! Answer generation via an OpenAI-compatible chat completion API.
//!
//! Builds the grounding prompt from retrieved chunks, calls the completion
//! endpoint, and post-processes the reply. The public entry point is
//! [`answer_question`], which is fail-soft: every failure past startup is
//! reported as an `Error: ...` answer instead of aborting the conversation.

use anyhow::{anyhow, bail, Context, Result};
use serde_json::{json, Value};
use std::time::Duration;

use crate::config::Config;
use crate::index::{self, VectorIndex};
use crate::models::{self, RetrievedChunk};

/// Environment variable holding the chat API key. Required at startup.
pub const API_KEY_VAR: &str = "GROQ_API_KEY";

/// Read the chat API key from the environment. Missing or empty is fatal;
/// callers check this before any conversation starts.
pub fn require_api_key() -> Result<String> {
    match std::env::var(API_KEY_VAR) {
        Ok(key) if !key.trim().is_empty() => Ok(key),
        _ => bail!("{} is not set. Export your API key before starting.", API_KEY_VAR),
    }
}

/// Join retrieved chunk texts into the context block, best match first.
/// Chunks are separated by a single newline.
pub fn context_from_chunks(chunks: &[RetrievedChunk]) -> String {
    chunks
        .iter()
        .map(|c| c.text.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}

/// The grounding prompt sent to the model. The wording instructs the model
/// to answer from the supplied context only.
pub fn build_prompt(context: &str, question: &str) -> String {
    format!(
        "Use only the following context to answer the question: {context}\nQuestion: {question}\nAnswer:"
    )
}

/// Strip `<think>...</think>` reasoning spans from a model reply.
///
/// Matches non-greedily across newlines; an unterminated `<think>` is left
/// in place. Idempotent, and trims surrounding whitespace at the end.
pub fn clean_response(raw: &str) -> String {
    const OPEN: &str = "<think>";
    const CLOSE: &str = "</think>";

    let mut out = String::with_capacity(raw.len());
    let mut rest = raw;
    loop {
        match rest.find(OPEN) {
            Some(start) => match rest[start + OPEN.len()..].find(CLOSE) {
                Some(end) => {
                    out.push_str(&rest[..start]);
                    rest = &rest[start + OPEN.len() + end + CLOSE.len()..];
                }
                None => {
                    out.push_str(rest);
                    break;
                }
            },
            None => {
                out.push_str(rest);
                break;
            }
        }
    }
    out.trim().to_string()
}

/// One chat completion round trip. Returns the raw assistant message.
pub async fn complete(
    config: &Config,
    api_key: &str,
    model_id: &str,
    prompt: &str,
    max_tokens: u32,
) -> Result<String> {
    let model = models::find_model(model_id)
        .ok_or_else(|| anyhow!("Unknown chat model: {}", model_id))?;
    let max_tokens = models::clamp_completion_tokens(model, max_tokens);

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.chat.timeout_secs))
        .build()?;

    let url = format!("{}/chat/completions", config.chat.api_url.trim_end_matches('/'));
    let body = json!({
        "model": model.id,
        "messages": [{"role": "user", "content": prompt}],
        "max_tokens": max_tokens,
    });

    let response = client
        .post(&url)
        .bearer_auth(api_key)
        .json(&body)
        .send()
        .await
        .context("Chat completion request failed")?;

    let status = response.status();
    if !status.is_success() {
        let text = response.text().await.unwrap_or_default();
        bail!("Chat API returned {}: {}", status, text);
    }

    let json: Value = response.json().await?;
    let content = json["choices"][0]["message"]["content"]
        .as_str()
        .ok_or_else(|| anyhow!("Chat API response missing message content"))?;

    Ok(content.to_string())
}

/// Result of answering one question.
pub struct Answer {
    /// Cleaned answer text, or an `Error: ...` report.
    pub text: String,
    /// Chunks the answer was grounded on; empty when retrieval failed.
    pub chunks: Vec<RetrievedChunk>,
}

/// Answer one question against the indexed document. Fail-soft: retrieval or
/// completion failures become an `Error: ...` answer so the conversation
/// survives transient upstream trouble.
pub async fn answer_question(
    config: &Config,
    index: &VectorIndex,
    api_key: &str,
    question: &str,
    model_id: &str,
    max_tokens: u32,
) -> Answer {
    match try_answer(config, index, api_key, question, model_id, max_tokens).await {
        Ok(answer) => answer,
        Err(e) => Answer {
            text: format!("Error: {e}"),
            chunks: Vec::new(),
        },
    }
}

async fn try_answer(
    config: &Config,
    index: &VectorIndex,
    api_key: &str,
    question: &str,
    model_id: &str,
    max_tokens: u32,
) -> Result<Answer> {
    let chunks = index::retrieve_chunks(config, index, question, config.retrieval.top_k).await?;
    let prompt = build_prompt(&context_from_chunks(&chunks), question);
    let raw = complete(config, api_key, model_id, &prompt, max_tokens).await?;
    Ok(Answer {
        text: clean_response(&raw),
        chunks,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_places_context_and_question_verbatim() {
        let prompt = build_prompt("CTX-BLOCK", "What is it?");
        assert_eq!(
            prompt,
            "Use only the following context to answer the question: CTX-BLOCK\nQuestion: What is it?\nAnswer:"
        );
    }

    #[test]
    fn context_joins_chunks_with_single_newline() {
        let chunks = vec![
            RetrievedChunk {
                chunk_index: 0,
                text: "first".to_string(),
                score: 0.9,
            },
            RetrievedChunk {
                chunk_index: 1,
                text: "second".to_string(),
                score: 0.5,
            },
        ];
        assert_eq!(context_from_chunks(&chunks), "first\nsecond");
    }

    #[test]
    fn clean_strips_think_span() {
        assert_eq!(clean_response("a<think>b</think>c"), "ac");
    }

    #[test]
    fn clean_strips_multiline_and_multiple_spans() {
        let raw = "<think>\nstep one\nstep two\n</think>The answer.<think>again</think>";
        assert_eq!(clean_response(raw), "The answer.");
    }

    #[test]
    fn clean_is_idempotent() {
        let once = clean_response("x<think>hidden</think>y");
        assert_eq!(clean_response(&once), once);
    }

    #[test]
    fn clean_leaves_unterminated_open_tag() {
        assert_eq!(clean_response("answer <think>still going"), "answer <think>still going");
    }

    #[test]
    fn clean_passes_plain_text_through() {
        assert_eq!(clean_response("  Paris.  "), "Paris.");
    }
}
