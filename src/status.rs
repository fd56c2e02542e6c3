//! The `status` command: what is currently indexed, and where.

use anyhow::Result;
use chrono::{TimeZone, Utc};
use sqlx::Row;

use crate::config::Config;
use crate::db;

pub async fn run_status(config: &Config) -> Result<()> {
    let db_path = &config.storage.db_path;
    println!("database: {}", db_path.display());
    if let Ok(meta) = std::fs::metadata(db_path) {
        println!("  size: {} bytes", meta.len());
    }

    let pool = db::connect(config).await?;

    let doc = sqlx::query("SELECT file_name, char_count, ingested_at FROM document")
        .fetch_optional(&pool)
        .await?;

    match doc {
        None => {
            println!("document: none ingested");
        }
        Some(row) => {
            let file_name: String = row.get("file_name");
            let char_count: i64 = row.get("char_count");
            let ingested_at: i64 = row.get("ingested_at");

            let chunk_count: i64 = sqlx::query("SELECT COUNT(*) AS n FROM chunks")
                .fetch_one(&pool)
                .await?
                .get("n");
            let embedded: i64 = sqlx::query("SELECT COUNT(*) AS n FROM embeddings")
                .fetch_one(&pool)
                .await?
                .get("n");
            let model: Option<String> = sqlx::query("SELECT model FROM embeddings LIMIT 1")
                .fetch_optional(&pool)
                .await?
                .map(|r| r.get("model"));

            println!("document: {}", file_name);
            println!("  characters: {}", char_count);
            println!("  chunks: {}", chunk_count);
            println!("  embedded: {}", embedded);
            if let Some(model) = model {
                println!("  embedding model: {}", model);
            }
            if let Some(ts) = Utc.timestamp_opt(ingested_at, 0).single() {
                println!("  ingested at: {}", ts.to_rfc3339());
            }
        }
    }

    pool.close().await;
    Ok(())
}
