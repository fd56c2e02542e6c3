//! # pdf-chat
//!
//! Chat with a PDF from your terminal.
//!
//! pdf-chat ingests a single PDF (extract → chunk → embed → index), persists
//! the vector index in SQLite, and answers questions about the document via a
//! hosted chat-completion API, grounding each answer in the most similar
//! chunks.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────┐   ┌──────────────┐   ┌──────────┐
//! │   PDF   │──▶│   Pipeline    │──▶│  SQLite   │
//! │ upload  │   │ Chunk+Embed  │   │  vectors  │
//! └─────────┘   └──────────────┘   └────┬─────┘
//!                                       │ top-k
//!                   ┌───────────────────┤
//!                   ▼                   ▼
//!              ┌──────────┐       ┌──────────┐
//!              │   CLI    │       │   HTTP   │
//!              │ (pdfchat)│       │  (JSON)  │
//!              └──────────┘       └──────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! export GROQ_API_KEY=...
//! pdfchat init                   # create database
//! pdfchat ingest report.pdf      # extract, chunk, embed, index
//! pdfchat ask "What is the conclusion?"
//! pdfchat chat                   # interactive loop
//! pdfchat serve                  # start HTTP server
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types and the chat model catalog |
//! | [`extract`] | PDF text extraction |
//! | [`chunk`] | Sliding-window text chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Persisted vector index and top-k retrieval |
//! | [`ingest`] | Ingestion pipeline orchestration |
//! | [`chat`] | Prompt assembly and answer generation |
//! | [`session`] | Append-only conversation history |
//! | [`server`] | JSON HTTP server |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod ask;
pub mod chat;
pub mod chunk;
pub mod config;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod ingest;
pub mod migrate;
pub mod models;
pub mod progress;
pub mod server;
pub mod session;
pub mod status;
