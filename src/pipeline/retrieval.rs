use std::sync::Arc;

use crate::models::internal::Chunk;
use crate::pipeline::cache::BoundedCache;
use crate::services::search_client::Retriever;

/// Retrieval stage: memoizes `query -> chunks` against the hosted search
/// endpoint. Identical query strings anywhere in the process share one
/// cached result for the process lifetime (LRU eviction only).
pub struct RetrievalStage {
    retriever: Arc<dyn Retriever>,
    cache: BoundedCache<String, Vec<Chunk>>,
    limit: usize,
}

impl RetrievalStage {
    pub fn new(retriever: Arc<dyn Retriever>, cache_capacity: usize, limit: usize) -> Self {
        Self {
            retriever,
            cache: BoundedCache::new(cache_capacity),
            limit,
        }
    }

    /// Returns up to `limit` chunks for the query. Upstream failure and
    /// empty results both yield `[]`; retrieval never fails the request.
    pub async fn retrieve_chunks(&self, query: &str) -> Vec<Chunk> {
        if let Some(chunks) = self.cache.get(&query.to_string()) {
            tracing::debug!("Retrieval cache hit for query: {}", query);
            return chunks;
        }

        let chunks = match self.retriever.search(query, self.limit).await {
            Ok(chunks) => {
                if chunks.is_empty() {
                    tracing::warn!("No documents found for query: {}", query);
                }
                chunks
            }
            Err(e) => {
                tracing::error!("An error occurred during retrieval: {}", e);
                return Vec::new();
            }
        };

        self.cache.put(query.to_string(), chunks.clone());
        chunks
    }
}

/// Joins retrieved chunk texts into the generation context. Separator is
/// normalized to a newline across all entry points; an empty retrieval
/// falls back to the query itself as context.
pub fn combine_chunks(query: &str, chunks: &[Chunk]) -> String {
    if chunks.is_empty() {
        return query.to_string();
    }
    chunks
        .iter()
        .map(|c| c.chunk.as_str())
        .collect::<Vec<_>>()
        .join("\n")
}
