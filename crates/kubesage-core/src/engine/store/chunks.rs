// Documentation chunk table: content, line-range metadata and embedding
// vectors, plus the cosine-similarity scan the retrieval port runs.

use rusqlite::params;

use super::InteractionStore;
use crate::atoms::error::EngineResult;
use crate::atoms::types::{ChunkMetadata, DocChunk};

// ── Vector helpers ─────────────────────────────────────────────────────

/// Decode a SQLite BLOB into an f32 vector (little-endian, 4 bytes each).
pub fn bytes_to_f32_vec(bytes: &[u8]) -> Vec<f32> {
    bytes
        .chunks_exact(4)
        .map(|c| f32::from_le_bytes([c[0], c[1], c[2], c[3]]))
        .collect()
}

/// Encode an f32 vector for BLOB storage.
pub fn f32_vec_to_bytes(vec: &[f32]) -> Vec<u8> {
    vec.iter().flat_map(|f| f.to_le_bytes()).collect()
}

/// Cosine similarity. Zero for mismatched lengths or zero-norm inputs.
pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let (mut dot, mut na, mut nb) = (0.0f64, 0.0f64, 0.0f64);
    for (x, y) in a.iter().zip(b.iter()) {
        let (x, y) = (*x as f64, *y as f64);
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    let denom = na.sqrt() * nb.sqrt();
    if denom < 1e-12 {
        0.0
    } else {
        dot / denom
    }
}

impl InteractionStore {
    // ── Corpus writes ──────────────────────────────────────────────────

    /// Insert or refresh one chunk. The id is derived from source + line
    /// range, so re-indexing the same file overwrites in place.
    pub fn upsert_chunk(&self, chunk: &DocChunk, embedding: Option<&[f32]>) -> EngineResult<()> {
        let conn = self.conn();
        let blob = embedding.map(f32_vec_to_bytes);
        conn.execute(
            "INSERT OR REPLACE INTO doc_chunks (id, source, start_line, end_line, content, embedding)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                chunk.id(),
                chunk.metadata.source,
                chunk.metadata.start_line as i64,
                chunk.metadata.end_line as i64,
                chunk.content,
                blob,
            ],
        )?;
        Ok(())
    }

    /// Drop every chunk indexed from `source`. Used before re-indexing a
    /// file whose chunk boundaries may have shifted.
    pub fn clear_source(&self, source: &str) -> EngineResult<usize> {
        let conn = self.conn();
        let n = conn.execute("DELETE FROM doc_chunks WHERE source = ?1", params![source])?;
        Ok(n)
    }

    pub fn chunk_count(&self) -> EngineResult<i64> {
        let conn = self.conn();
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM doc_chunks", [], |r| r.get(0))?;
        Ok(count)
    }

    // ── Corpus search ──────────────────────────────────────────────────

    /// Top-k chunks by cosine similarity against a query embedding,
    /// best first. Chunks stored without a vector are skipped.
    pub fn search_chunks_by_embedding(
        &self,
        query_embedding: &[f32],
        k: usize,
    ) -> EngineResult<Vec<DocChunk>> {
        let conn = self.conn();
        let mut stmt = conn.prepare(
            "SELECT source, start_line, end_line, content, embedding
             FROM doc_chunks WHERE embedding IS NOT NULL",
        )?;

        let mut scored: Vec<(DocChunk, f64)> = stmt
            .query_map([], |row| {
                let source: String = row.get(0)?;
                let start_line: i64 = row.get(1)?;
                let end_line: i64 = row.get(2)?;
                let content: String = row.get(3)?;
                let blob: Vec<u8> = row.get(4)?;
                Ok((source, start_line, end_line, content, blob))
            })?
            .filter_map(|r| r.ok())
            .map(|(source, start_line, end_line, content, blob)| {
                let score = cosine_similarity(query_embedding, &bytes_to_f32_vec(&blob));
                let chunk = DocChunk {
                    content,
                    metadata: ChunkMetadata {
                        source,
                        start_line: start_line as usize,
                        end_line: end_line as usize,
                    },
                };
                (chunk, score)
            })
            .collect();

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(k);

        Ok(scored.into_iter().map(|(c, _)| c).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunk(source: &str, start: usize, content: &str) -> DocChunk {
        DocChunk {
            content: content.into(),
            metadata: ChunkMetadata {
                source: source.into(),
                start_line: start,
                end_line: start + 39,
            },
        }
    }

    #[test]
    fn vector_blob_roundtrip() {
        let v = vec![0.25f32, -1.5, 3.0];
        assert_eq!(bytes_to_f32_vec(&f32_vec_to_bytes(&v)), v);
    }

    #[test]
    fn cosine_basics() {
        assert!((cosine_similarity(&[1.0, 0.0], &[1.0, 0.0]) - 1.0).abs() < 1e-9);
        assert_eq!(cosine_similarity(&[1.0, 0.0], &[0.0, 1.0]), 0.0);
        assert_eq!(cosine_similarity(&[1.0], &[1.0, 2.0]), 0.0);
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn search_orders_by_similarity() {
        let store = InteractionStore::open_in_memory().unwrap();
        store.upsert_chunk(&chunk("a.md", 0, "pods"), Some(&[1.0, 0.0])).unwrap();
        store.upsert_chunk(&chunk("b.md", 0, "deployments"), Some(&[0.7, 0.7])).unwrap();
        store.upsert_chunk(&chunk("c.md", 0, "services"), Some(&[0.0, 1.0])).unwrap();
        // No embedding — must never be returned.
        store.upsert_chunk(&chunk("d.md", 0, "orphan"), None).unwrap();

        let hits = store.search_chunks_by_embedding(&[1.0, 0.0], 2).unwrap();
        assert_eq!(hits.len(), 2);
        assert_eq!(hits[0].metadata.source, "a.md");
        assert_eq!(hits[1].metadata.source, "b.md");
    }

    #[test]
    fn reindex_overwrites_and_clear_source_drops() {
        let store = InteractionStore::open_in_memory().unwrap();
        store.upsert_chunk(&chunk("a.md", 0, "v1"), Some(&[1.0])).unwrap();
        store.upsert_chunk(&chunk("a.md", 0, "v2"), Some(&[1.0])).unwrap();
        assert_eq!(store.chunk_count().unwrap(), 1);

        let hits = store.search_chunks_by_embedding(&[1.0], 5).unwrap();
        assert_eq!(hits[0].content, "v2");

        assert_eq!(store.clear_source("a.md").unwrap(), 1);
        assert_eq!(store.chunk_count().unwrap(), 0);
    }
}
