//! # pdf-chat CLI (`pdfchat`)
//!
//! The `pdfchat` binary is the primary interface for pdf-chat. It provides
//! commands for database initialization, PDF ingestion, question answering,
//! and starting the HTTP server.
//!
//! ## Usage
//!
//! ```bash
//! pdfchat --config ./config/pdfchat.toml <command>
//! ```
//!
//! ## Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `pdfchat init` | Create the SQLite database and run schema migrations |
//! | `pdfchat ingest <file>` | Extract, chunk, embed, and index a PDF |
//! | `pdfchat ask "<question>"` | Answer one question about the indexed PDF |
//! | `pdfchat chat` | Interactive question loop |
//! | `pdfchat models` | List the available chat models |
//! | `pdfchat status` | Show what is currently indexed |
//! | `pdfchat serve` | Start the JSON HTTP server |
//!
//! The `ask`, `chat`, and `serve` commands require `GROQ_API_KEY` in the
//! environment.

mod ask;
mod chat;
mod chunk;
mod config;
mod db;
mod embedding;
mod extract;
mod index;
mod ingest;
mod migrate;
mod models;
mod progress;
mod server;
mod session;
mod status;

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// pdf-chat CLI — ingest a PDF and chat with it from the terminal.
///
/// All commands accept a `--config` flag pointing to a TOML configuration
/// file. See `config/pdfchat.example.toml` for a full example.
#[derive(Parser)]
#[command(
    name = "pdfchat",
    about = "pdf-chat — ingest a PDF and chat with it from the terminal",
    version,
    long_about = "pdf-chat extracts text from a PDF, chunks and embeds it into a persisted \
    vector index, and answers questions about the document through a hosted chat-completion \
    API, grounding every answer in the most similar chunks."
)]
struct Cli {
    /// Path to configuration file (TOML).
    ///
    /// Defaults to `./config/pdfchat.toml`. Storage, chunking, embedding,
    /// chat, and server settings are read from this file; missing file means
    /// built-in defaults.
    #[arg(long, global = true, default_value = "./config/pdfchat.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

/// Top-level CLI commands.
#[derive(Subcommand)]
enum Commands {
    /// Initialize the database schema.
    ///
    /// Creates the SQLite database file and all required tables (document,
    /// chunks, embeddings, chunk_vectors). This command is idempotent —
    /// running it multiple times is safe.
    Init,

    /// Ingest a PDF: extract, chunk, embed, and index it.
    ///
    /// Replaces whatever document was indexed before. A failed ingestion
    /// leaves the previous index untouched.
    Ingest {
        /// Path to the PDF file.
        file: PathBuf,
    },

    /// Answer a single question about the indexed document.
    Ask {
        /// The question to answer.
        question: String,

        /// Chat model id (see `pdfchat models`).
        #[arg(long)]
        model: Option<String>,

        /// Completion token budget; clamped to the model's ceiling.
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// Interactive question loop. Type `exit` or press Ctrl-D to quit.
    Chat {
        /// Chat model id (see `pdfchat models`).
        #[arg(long)]
        model: Option<String>,

        /// Completion token budget; clamped to the model's ceiling.
        #[arg(long)]
        max_tokens: Option<u32>,
    },

    /// List the available chat models.
    Models,

    /// Show what is currently indexed.
    Status,

    /// Start the JSON HTTP server.
    ///
    /// Binds to the address configured in `[server].bind` and serves the
    /// ingest/ask/history/models/status endpoints.
    Serve,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let cfg = config::load_config(&cli.config)?;

    match cli.command {
        Commands::Init => {
            migrate::run_migrations(&cfg).await?;
            println!("Database initialized successfully.");
        }
        Commands::Ingest { file } => {
            let progress = progress::default_reporter();
            ingest::run_ingest(&cfg, &file, progress.as_ref()).await?;
        }
        Commands::Ask {
            question,
            model,
            max_tokens,
        } => {
            let model = model.unwrap_or_else(|| cfg.chat.default_model.clone());
            let max_tokens = max_tokens.unwrap_or(cfg.chat.default_max_tokens);
            ask::run_ask(&cfg, &question, &model, max_tokens).await?;
        }
        Commands::Chat { model, max_tokens } => {
            let model = model.unwrap_or_else(|| cfg.chat.default_model.clone());
            let max_tokens = max_tokens.unwrap_or(cfg.chat.default_max_tokens);
            ask::run_chat(&cfg, &model, max_tokens).await?;
        }
        Commands::Models => {
            ask::run_models()?;
        }
        Commands::Status => {
            status::run_status(&cfg).await?;
        }
        Commands::Serve => {
            server::run_server(&cfg).await?;
        }
    }

    Ok(())
}
