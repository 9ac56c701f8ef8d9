// Kubesage Engine — Embedding Retrieval
// Default implementation of the retrieval port: embed the query, scan the
// indexed documentation corpus by cosine similarity, return the top-k
// chunks. Ranking is deterministic for a fixed corpus state.
//
// Module layout:
//   embedding — EmbeddingClient (Ollama + OpenAI-compatible API calls)
//   indexer   — corpus ingestion: files → line-ranged chunks → vectors

pub mod embedding;
pub mod indexer;

pub use embedding::{EmbeddingClient, EmbeddingConfig};
pub use indexer::DocIndexer;

use std::sync::Arc;

use async_trait::async_trait;
use log::info;
use tokio_util::sync::CancellationToken;

use crate::atoms::error::{EngineError, EngineResult};
use crate::atoms::traits::RetrievalPort;
use crate::atoms::types::DocChunk;
use crate::engine::store::InteractionStore;

pub struct DocRetriever {
    client: EmbeddingClient,
    store: Arc<InteractionStore>,
}

impl DocRetriever {
    pub fn new(client: EmbeddingClient, store: Arc<InteractionStore>) -> Self {
        DocRetriever { client, store }
    }
}

#[async_trait]
impl RetrievalPort for DocRetriever {
    async fn search(
        &self,
        query: &str,
        k: usize,
        cancel: &CancellationToken,
    ) -> EngineResult<Vec<DocChunk>> {
        let query_vec = tokio::select! {
            r = self.client.embed(query) => r?,
            _ = cancel.cancelled() => return Err(EngineError::Cancelled),
        };

        let hits = self.store.search_chunks_by_embedding(&query_vec, k)?;
        info!(
            "[retrieval] {} hit(s) for '{}'",
            hits.len(),
            &query[..query.len().min(60)]
        );
        Ok(hits)
    }
}
