use anyhow::Result;
use sqlx::SqlitePool;

use crate::config::Config;
use crate::db;

/// Create the index schema on an open pool. Idempotent.
pub async fn ensure_schema(pool: &SqlitePool) -> Result<()> {
    // One row describing the currently indexed document.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS document (
            id TEXT PRIMARY KEY,
            file_name TEXT NOT NULL,
            char_count INTEGER NOT NULL,
            ingested_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunks (
            id TEXT PRIMARY KEY,
            document_id TEXT NOT NULL,
            chunk_index INTEGER NOT NULL,
            text TEXT NOT NULL,
            hash TEXT NOT NULL,
            UNIQUE(document_id, chunk_index),
            FOREIGN KEY (document_id) REFERENCES document(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    // Embedding metadata, keyed by chunk; records the model so queries can
    // verify embedding-space compatibility.
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS embeddings (
            chunk_id TEXT PRIMARY KEY,
            model TEXT NOT NULL,
            dims INTEGER NOT NULL,
            created_at INTEGER NOT NULL,
            hash TEXT NOT NULL,
            FOREIGN KEY (chunk_id) REFERENCES chunks(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS chunk_vectors (
            chunk_id TEXT PRIMARY KEY,
            embedding BLOB NOT NULL,
            FOREIGN KEY (chunk_id) REFERENCES chunks(id)
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query("CREATE INDEX IF NOT EXISTS idx_chunks_document_id ON chunks(document_id)")
        .execute(pool)
        .await?;

    Ok(())
}

/// Create the database file and schema. Idempotent; safe to run repeatedly.
pub async fn run_migrations(config: &Config) -> Result<()> {
    // connect() ensures the schema on open.
    let pool = db::connect(config).await?;
    pool.close().await;
    Ok(())
}
