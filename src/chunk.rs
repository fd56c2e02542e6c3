//! Sliding-window text chunker.
//!
//! Splits extracted document text into [`Chunk`]s of at most `chunk_size`
//! characters where consecutive chunks share exactly `overlap` characters.
//! Within a window the split prefers a paragraph boundary (`\n\n`), then a
//! sentence end, then whitespace, before falling back to a hard character cut.
//!
//! Two invariants hold for any input:
//! - no chunk exceeds `chunk_size` characters;
//! - concatenating the chunks with overlaps collapsed reconstructs the
//!   source text exactly.
//!
//! Each chunk receives a UUID plus a SHA-256 hash of its text for embedding
//! staleness detection.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::models::Chunk;

/// Split text into windows of at most `chunk_size` characters with `overlap`
/// characters shared between neighbors. Deterministic for identical input.
///
/// Requires `overlap < chunk_size`. Returns no windows for empty input.
pub fn split_sliding(text: &str, chunk_size: usize, overlap: usize) -> Vec<String> {
    assert!(overlap < chunk_size, "overlap must be < chunk_size");

    let cs: Vec<char> = text.chars().collect();
    if cs.is_empty() {
        return Vec::new();
    }

    let mut windows = Vec::new();
    let mut start = 0usize;

    loop {
        if cs.len() - start <= chunk_size {
            windows.push(cs[start..].iter().collect());
            break;
        }

        let hi = start + chunk_size;
        // The cut must leave room for the overlap while still advancing.
        let lo = start + overlap + 1;
        let cut = find_cut(&cs, lo, hi);

        windows.push(cs[start..cut].iter().collect());
        start = cut - overlap;
    }

    windows
}

/// Pick the cut position in `(lo..=hi]`: latest paragraph break, else latest
/// sentence end, else latest whitespace, else the hard limit `hi`.
fn find_cut(cs: &[char], lo: usize, hi: usize) -> usize {
    let mut sentence = None;
    let mut whitespace = None;

    for b in (lo..=hi).rev() {
        if b >= 2 && cs[b - 1] == '\n' && cs[b - 2] == '\n' {
            return b;
        }
        if sentence.is_none()
            && matches!(cs[b - 1], '.' | '!' | '?')
            && (b == cs.len() || cs[b].is_whitespace())
        {
            sentence = Some(b);
        }
        if whitespace.is_none() && cs[b - 1].is_whitespace() {
            whitespace = Some(b);
        }
    }

    sentence.or(whitespace).unwrap_or(hi)
}

/// Split text into [`Chunk`]s with contiguous indices starting at 0.
pub fn chunk_text(text: &str, chunking: &ChunkingConfig) -> Vec<Chunk> {
    split_sliding(text, chunking.chunk_size, chunking.overlap)
        .into_iter()
        .enumerate()
        .map(|(i, piece)| make_chunk(i as i64, piece))
        .collect()
}

fn make_chunk(index: i64, text: String) -> Chunk {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    Chunk {
        id: Uuid::new_v4().to_string(),
        chunk_index: index,
        text,
        hash,
    }
}
