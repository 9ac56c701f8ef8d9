// Kubesage Engine — Documentation Indexer
// Ingests markdown/text files into line-ranged chunks, embeds each chunk
// and upserts it into the corpus table the retrieval port searches.

use std::path::Path;
use std::sync::Arc;

use log::{info, warn};

use crate::atoms::constants::{CHUNK_LINES, CHUNK_OVERLAP};
use crate::atoms::error::EngineResult;
use crate::atoms::types::{ChunkMetadata, DocChunk};
use crate::engine::retrieval::EmbeddingClient;
use crate::engine::store::InteractionStore;

pub struct DocIndexer {
    client: EmbeddingClient,
    store: Arc<InteractionStore>,
}

/// Split a document into fixed-size line windows with overlap. Line ranges
/// are zero-based and inclusive, and deterministic for a given content —
/// chunk ids derived from them survive re-indexing of unchanged files.
pub fn chunk_document(source: &str, content: &str) -> Vec<DocChunk> {
    let lines: Vec<&str> = content.lines().collect();
    if lines.is_empty() {
        return Vec::new();
    }

    let step = CHUNK_LINES.saturating_sub(CHUNK_OVERLAP).max(1);
    let mut chunks = Vec::new();
    let mut start = 0usize;

    loop {
        let end = (start + CHUNK_LINES).min(lines.len());
        let text = lines[start..end].join("\n");
        if !text.trim().is_empty() {
            chunks.push(DocChunk {
                content: text,
                metadata: ChunkMetadata {
                    source: source.to_string(),
                    start_line: start,
                    end_line: end - 1,
                },
            });
        }
        if end == lines.len() {
            break;
        }
        start += step;
    }

    chunks
}

impl DocIndexer {
    pub fn new(client: EmbeddingClient, store: Arc<InteractionStore>) -> Self {
        DocIndexer { client, store }
    }

    /// Index one file or every .md/.txt file under a directory.
    /// Returns the number of chunks written.
    pub async fn index_path(&self, path: &Path) -> EngineResult<usize> {
        let mut total = 0usize;
        if path.is_dir() {
            for entry in collect_doc_files(path)? {
                total += self.index_file(&entry).await?;
            }
        } else {
            total += self.index_file(path).await?;
        }
        info!("[indexer] indexed {} chunk(s) from {:?}", total, path);
        Ok(total)
    }

    async fn index_file(&self, path: &Path) -> EngineResult<usize> {
        let source = path.to_string_lossy().to_string();
        let content = std::fs::read_to_string(path)?;
        let chunks = chunk_document(&source, &content);

        // Chunk boundaries may have shifted since the last run.
        self.store.clear_source(&source)?;

        let mut written = 0usize;
        for chunk in &chunks {
            match self.client.embed(&chunk.content).await {
                Ok(vec) => {
                    self.store.upsert_chunk(chunk, Some(&vec))?;
                    written += 1;
                }
                Err(e) => {
                    warn!("[indexer] embed failed for {} — skipping: {}", chunk.id(), e);
                }
            }
        }

        info!("[indexer] {} → {} chunk(s)", source, written);
        Ok(written)
    }
}

fn collect_doc_files(dir: &Path) -> EngineResult<Vec<std::path::PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dir)? {
        let entry = entry?;
        let path = entry.path();
        if path.is_dir() {
            files.extend(collect_doc_files(&path)?);
        } else if matches!(
            path.extension().and_then(|e| e.to_str()),
            Some("md") | Some("txt")
        ) {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chunking_empty_document() {
        assert!(chunk_document("a.md", "").is_empty());
    }

    #[test]
    fn chunking_short_document_is_one_chunk() {
        let content = "line one\nline two\nline three";
        let chunks = chunk_document("a.md", content);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].metadata.start_line, 0);
        assert_eq!(chunks[0].metadata.end_line, 2);
        assert_eq!(chunks[0].id(), "a.md:0-2");
    }

    #[test]
    fn chunking_overlaps_and_covers_all_lines() {
        let content = (0..100).map(|n| format!("line {}", n)).collect::<Vec<_>>().join("\n");
        let chunks = chunk_document("a.md", &content);

        // step = 40 - 10 = 30 → starts at 0, 30, 60, 90
        assert_eq!(chunks.len(), 4);
        assert_eq!(chunks[0].metadata.start_line, 0);
        assert_eq!(chunks[0].metadata.end_line, 39);
        assert_eq!(chunks[1].metadata.start_line, 30);
        assert_eq!(chunks[3].metadata.end_line, 99);
    }

    #[test]
    fn chunking_skips_blank_windows() {
        let content = "\n".repeat(50);
        assert!(chunk_document("a.md", &content).is_empty());
    }

    #[test]
    fn chunking_is_deterministic() {
        let content = (0..80).map(|n| format!("l{}", n)).collect::<Vec<_>>().join("\n");
        let a = chunk_document("doc.md", &content);
        let b = chunk_document("doc.md", &content);
        let ids_a: Vec<String> = a.iter().map(|c| c.id()).collect();
        let ids_b: Vec<String> = b.iter().map(|c| c.id()).collect();
        assert_eq!(ids_a, ids_b);
    }
}
