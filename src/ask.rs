//! Question answering commands: one-shot `ask` and the interactive `chat`
//! loop, plus the model catalog listing.

use anyhow::{bail, Result};
use std::io::{BufRead, Write};

use crate::chat;
use crate::config::Config;
use crate::db;
use crate::index::VectorIndex;
use crate::models;
use crate::session::Session;

/// Shown when a question arrives before any document has been ingested.
pub const NOT_READY: &str = "No document ingested yet. Run `pdfchat ingest <file>` first.";

async fn load_index(config: &Config) -> Result<Option<VectorIndex>> {
    let pool = db::connect(config).await?;
    let index = VectorIndex::load(&pool).await?;
    pool.close().await;
    Ok(index)
}

/// Answer a single question and print the result.
pub async fn run_ask(
    config: &Config,
    question: &str,
    model_id: &str,
    max_tokens: u32,
) -> Result<()> {
    if models::find_model(model_id).is_none() {
        bail!("Unknown chat model: {} (see `pdfchat models`)", model_id);
    }
    let api_key = chat::require_api_key()?;

    let index = match load_index(config).await? {
        Some(index) => index,
        None => {
            println!("{}", NOT_READY);
            return Ok(());
        }
    };

    let answer =
        chat::answer_question(config, &index, &api_key, question, model_id, max_tokens).await;
    println!("{}", answer.text);
    Ok(())
}

/// Interactive loop: read questions from stdin, print answers, keep an
/// append-only session history. `exit` or EOF ends the loop.
pub async fn run_chat(config: &Config, model_id: &str, max_tokens: u32) -> Result<()> {
    if models::find_model(model_id).is_none() {
        bail!("Unknown chat model: {} (see `pdfchat models`)", model_id);
    }
    let api_key = chat::require_api_key()?;
    let index = load_index(config).await?;
    let mut session = Session::new();

    if let Some(index) = &index {
        eprintln!(
            "chatting with {} ({} chunks); type a question, or `exit` to quit",
            index.document.file_name,
            index.len()
        );
    } else {
        eprintln!("{}", NOT_READY);
    }

    let stdin = std::io::stdin();
    loop {
        eprint!("> ");
        let _ = std::io::stderr().flush();

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let question = line.trim();
        if question.is_empty() {
            continue;
        }
        if question == "exit" || question == "quit" {
            break;
        }

        // Questions before ingestion are answered with a notice and do not
        // enter the history.
        let index = match &index {
            Some(index) => index,
            None => {
                println!("{}", NOT_READY);
                continue;
            }
        };

        let answer =
            chat::answer_question(config, index, &api_key, question, model_id, max_tokens).await;
        println!("{}", answer.text);
        session.record_exchange(question, &answer.text);
    }

    if !session.is_empty() {
        eprintln!("{} turns recorded", session.len());
    }
    Ok(())
}

/// Print the chat model catalog.
pub fn run_models() -> Result<()> {
    println!(
        "{:<32} {:<12} {:>10}  name",
        "id", "developer", "max tokens"
    );
    for model in models::MODEL_CATALOG {
        println!(
            "{:<32} {:<12} {:>10}  {}",
            model.id, model.developer, model.max_tokens, model.name
        );
    }
    Ok(())
}
