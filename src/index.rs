//! The persisted vector index.
//!
//! The index is an unordered collection of (embedding vector, chunk text)
//! pairs backed by SQLite. Exactly one document is indexed at a time: a new
//! ingestion replaces the whole index in a single transaction, so a failed
//! ingestion leaves the previous index intact and queryable.
//!
//! [`VectorIndex::load`] implements load-on-start: present only when the
//! store holds at least one embedded chunk; otherwise querying is disabled
//! until an ingestion occurs.

use anyhow::{bail, Result};
use sqlx::{Row, SqlitePool};
use uuid::Uuid;

use crate::embedding::{self, blob_to_vec, cosine_similarity, vec_to_blob};
use crate::models::{Chunk, RetrievedChunk};

/// Metadata for the currently indexed document.
#[derive(Debug, Clone)]
pub struct IndexedDocument {
    pub id: String,
    pub file_name: String,
    pub char_count: i64,
    pub ingested_at: i64,
}

/// In-memory view of the persisted index, loaded once per process or after
/// an ingestion.
pub struct VectorIndex {
    pub document: IndexedDocument,
    /// Embedding model that produced the stored vectors.
    pub model: String,
    pub dims: usize,
    entries: Vec<IndexEntry>,
}

struct IndexEntry {
    chunk_index: i64,
    text: String,
    vector: Vec<f32>,
}

impl VectorIndex {
    /// Load the persisted index, or `None` when nothing has been ingested.
    pub async fn load(pool: &SqlitePool) -> Result<Option<VectorIndex>> {
        let doc_row = sqlx::query("SELECT id, file_name, char_count, ingested_at FROM document")
            .fetch_optional(pool)
            .await?;

        let doc_row = match doc_row {
            Some(row) => row,
            None => return Ok(None),
        };

        let document = IndexedDocument {
            id: doc_row.get("id"),
            file_name: doc_row.get("file_name"),
            char_count: doc_row.get("char_count"),
            ingested_at: doc_row.get("ingested_at"),
        };

        let rows = sqlx::query(
            r#"
            SELECT c.chunk_index, c.text, cv.embedding, e.model, e.dims
            FROM chunks c
            JOIN chunk_vectors cv ON cv.chunk_id = c.id
            JOIN embeddings e ON e.chunk_id = c.id
            ORDER BY c.chunk_index ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        if rows.is_empty() {
            return Ok(None);
        }

        let model: String = rows[0].get("model");
        let dims: i64 = rows[0].get("dims");

        let entries: Vec<IndexEntry> = rows
            .iter()
            .map(|row| {
                let blob: Vec<u8> = row.get("embedding");
                IndexEntry {
                    chunk_index: row.get("chunk_index"),
                    text: row.get("text"),
                    vector: blob_to_vec(&blob),
                }
            })
            .collect();

        Ok(Some(VectorIndex {
            document,
            model,
            dims: dims as usize,
            entries,
        }))
    }

    /// Number of indexed chunks.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Top-k nearest chunks by cosine similarity, best first. Returns at
    /// most `k` results; no score threshold is applied.
    ///
    /// Ties break on chunk index so results are deterministic.
    pub fn query(&self, vector: &[f32], k: usize) -> Vec<RetrievedChunk> {
        let mut scored: Vec<RetrievedChunk> = self
            .entries
            .iter()
            .map(|e| RetrievedChunk {
                chunk_index: e.chunk_index,
                text: e.text.clone(),
                score: cosine_similarity(vector, &e.vector) as f64,
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.chunk_index.cmp(&b.chunk_index))
        });
        scored.truncate(k);
        scored
    }
}

/// Replace the persisted index with a freshly ingested document.
///
/// Runs delete-all + insert in one transaction: a prior index survives any
/// failure up to the commit, and afterwards only the new document is
/// queryable.
pub async fn replace_index(
    pool: &SqlitePool,
    file_name: &str,
    char_count: usize,
    model: &str,
    dims: usize,
    chunks: &[Chunk],
    vectors: &[Vec<f32>],
) -> Result<String> {
    if chunks.len() != vectors.len() {
        bail!(
            "chunk/vector count mismatch: {} chunks, {} vectors",
            chunks.len(),
            vectors.len()
        );
    }

    let doc_id = Uuid::new_v4().to_string();
    let now = chrono::Utc::now().timestamp();

    let mut tx = pool.begin().await?;

    sqlx::query("DELETE FROM chunk_vectors").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM embeddings").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM chunks").execute(&mut *tx).await?;
    sqlx::query("DELETE FROM document").execute(&mut *tx).await?;

    sqlx::query("INSERT INTO document (id, file_name, char_count, ingested_at) VALUES (?, ?, ?, ?)")
        .bind(&doc_id)
        .bind(file_name)
        .bind(char_count as i64)
        .bind(now)
        .execute(&mut *tx)
        .await?;

    for (chunk, vector) in chunks.iter().zip(vectors.iter()) {
        sqlx::query(
            "INSERT INTO chunks (id, document_id, chunk_index, text, hash) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chunk.id)
        .bind(&doc_id)
        .bind(chunk.chunk_index)
        .bind(&chunk.text)
        .bind(&chunk.hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query(
            "INSERT INTO embeddings (chunk_id, model, dims, created_at, hash) VALUES (?, ?, ?, ?, ?)",
        )
        .bind(&chunk.id)
        .bind(model)
        .bind(dims as i64)
        .bind(now)
        .bind(&chunk.hash)
        .execute(&mut *tx)
        .await?;

        sqlx::query("INSERT INTO chunk_vectors (chunk_id, embedding) VALUES (?, ?)")
            .bind(&chunk.id)
            .bind(vec_to_blob(vector))
            .execute(&mut *tx)
            .await?;
    }

    tx.commit().await?;
    Ok(doc_id)
}

/// Embed `query` and return its top-k nearest chunks.
///
/// Fails when the configured embedding model differs from the one the index
/// was built with; similarity across embedding spaces is meaningless.
pub async fn retrieve_chunks(
    config: &crate::config::Config,
    index: &VectorIndex,
    query: &str,
    k: usize,
) -> Result<Vec<RetrievedChunk>> {
    let provider = embedding::create_provider(&config.embedding)?;

    if provider.model_name() != index.model {
        bail!(
            "index was built with embedding model '{}' but '{}' is configured; re-ingest the document",
            index.model,
            provider.model_name()
        );
    }

    let query_vec = embedding::embed_query(provider.as_ref(), &config.embedding, query).await?;
    Ok(index.query(&query_vec, k))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn index_with(vectors: Vec<(i64, &str, Vec<f32>)>) -> VectorIndex {
        VectorIndex {
            document: IndexedDocument {
                id: "doc".to_string(),
                file_name: "test.pdf".to_string(),
                char_count: 0,
                ingested_at: 0,
            },
            model: "test".to_string(),
            dims: 3,
            entries: vectors
                .into_iter()
                .map(|(i, t, v)| IndexEntry {
                    chunk_index: i,
                    text: t.to_string(),
                    vector: v,
                })
                .collect(),
        }
    }

    #[test]
    fn query_returns_at_most_k() {
        let index = index_with(vec![
            (0, "a", vec![1.0, 0.0, 0.0]),
            (1, "b", vec![0.0, 1.0, 0.0]),
            (2, "c", vec![0.0, 0.0, 1.0]),
        ]);
        assert_eq!(index.query(&[1.0, 0.0, 0.0], 2).len(), 2);
        assert_eq!(index.query(&[1.0, 0.0, 0.0], 10).len(), 3);
    }

    #[test]
    fn query_orders_by_similarity_descending() {
        let index = index_with(vec![
            (0, "far", vec![0.0, 1.0, 0.0]),
            (1, "near", vec![1.0, 0.1, 0.0]),
            (2, "exact", vec![1.0, 0.0, 0.0]),
        ]);
        let results = index.query(&[1.0, 0.0, 0.0], 3);
        assert_eq!(results[0].text, "exact");
        assert_eq!(results[1].text, "near");
        assert_eq!(results[2].text, "far");
        assert!(results[0].score >= results[1].score);
        assert!(results[1].score >= results[2].score);
    }

    #[test]
    fn query_ties_break_on_chunk_index() {
        let index = index_with(vec![
            (1, "second", vec![1.0, 0.0, 0.0]),
            (0, "first", vec![1.0, 0.0, 0.0]),
        ]);
        let results = index.query(&[1.0, 0.0, 0.0], 2);
        assert_eq!(results[0].text, "first");
        assert_eq!(results[1].text, "second");
    }

    #[test]
    fn query_applies_no_score_threshold() {
        // Dissimilar chunks are still returned; precision is the caller's
        // problem by contract.
        let index = index_with(vec![(0, "opposite", vec![-1.0, 0.0, 0.0])]);
        let results = index.query(&[1.0, 0.0, 0.0], 2);
        assert_eq!(results.len(), 1);
        assert!(results[0].score < 0.0);
    }
}
