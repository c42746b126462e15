use crate::error::Result;
use crate::fusion::RRFFusion;
use crate::rerank::{RankedChunk, Reranker};
use pommel_embedder::EmbeddingProvider;
use pommel_store::{SearchFilters, Store};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct HybridSearchConfig {
    /// How many fused candidates to hydrate and hand to the reranker,
    /// ahead of the final truncation to the caller's requested `limit`
    /// (§4.4: rerank a wider pool than what's actually returned).
    pub rerank_pool_multiplier: usize,
    pub fusion: RRFFusion,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            rerank_pool_multiplier: 4,
            fusion: RRFFusion::default(),
        }
    }
}

/// The full retrieval pipeline (§4.4):
/// query -> embed -> {vector search, lexical search} -> RRF fuse ->
/// hydrate chunks -> rerank -> truncate to `limit`.
pub struct HybridSearch {
    store: Arc<Store>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Box<dyn Reranker>,
    config: HybridSearchConfig,
}

impl HybridSearch {
    #[must_use]
    pub fn new(
        store: Arc<Store>,
        embedder: Arc<dyn EmbeddingProvider>,
        reranker: Box<dyn Reranker>,
        config: HybridSearchConfig,
    ) -> Self {
        Self {
            store,
            embedder,
            reranker,
            config,
        }
    }

    pub async fn search(&self, query: &str, limit: usize) -> Result<Vec<RankedChunk>> {
        self.search_filtered(query, limit, &SearchFilters::default()).await
    }

    /// Same as [`Self::search`] but with `levels`/`path_prefix`/
    /// `subproject_ids`/`languages` pushed down to the store (§4.7).
    pub async fn search_filtered(&self, query: &str, limit: usize, filters: &SearchFilters) -> Result<Vec<RankedChunk>> {
        let query = query.trim();
        if query.is_empty() || limit == 0 {
            return Ok(Vec::new());
        }

        let pool_size = (limit * self.config.rerank_pool_multiplier.max(1)).max(limit);

        let query_vector = self.embedder.embed_query(query).await?;
        let dense_hits = self
            .store
            .vector_search(self.embedder.model_id(), &query_vector, filters, pool_size)?;
        let lexical_hits = self.store.lexical_search(query, filters, pool_size)?;

        let fused = self.config.fusion.fuse(&dense_hits, &lexical_hits);
        let candidate_ids: Vec<String> = fused.iter().take(pool_size).map(|(id, _)| id.clone()).collect();
        let fused_scores: std::collections::HashMap<&String, f32> =
            fused.iter().take(pool_size).map(|(id, score)| (id, *score)).collect();

        let chunks = self.store.get_chunks(&candidate_ids)?;
        let candidates: Vec<RankedChunk> = chunks
            .iter()
            .map(|chunk| {
                let score = fused_scores.get(&chunk.id).copied().unwrap_or(0.0);
                RankedChunk::from_chunk(chunk, score)
            })
            .collect();

        let mut reranked = self.reranker.rerank(query, candidates).await?;
        reranked.truncate(limit);
        Ok(reranked)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rerank::HeuristicReranker;
    use pommel_chunker::{Chunk, Level};
    use pommel_embedder::MockEmbedder;

    fn sample_chunk(id_seed: &str, content: &str) -> Chunk {
        Chunk::new(
            format!("src/{id_seed}.rs"),
            Level::Method,
            1,
            5,
            content.to_string(),
            Some("rust".to_string()),
            Some(id_seed.to_string()),
            None,
            0,
        )
    }

    #[tokio::test]
    async fn search_returns_results_ranked_by_relevance() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbedder::new(16));

        let widget = sample_chunk("widget", "fn widget_new() -> Widget {}");
        let gadget = sample_chunk("gadget", "fn gadget_new() -> Gadget {}");
        store.upsert_chunks(&[widget.clone(), gadget.clone()]).unwrap();

        for chunk in [&widget, &gadget] {
            let vector = embedder.embed_query(&chunk.content).await.unwrap();
            store.upsert_embedding(&chunk.id, embedder.model_id(), &vector).unwrap();
        }

        let search = HybridSearch::new(
            Arc::clone(&store),
            embedder,
            Box::new(HeuristicReranker::new()),
            HybridSearchConfig::default(),
        );

        let results = search.search("widget_new", 5).await.unwrap();
        assert!(!results.is_empty());
        assert_eq!(results[0].chunk_id, widget.id);
    }

    #[tokio::test]
    async fn empty_query_returns_no_results() {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbedder::new(8));
        let search = HybridSearch::new(store, embedder, Box::new(HeuristicReranker::new()), HybridSearchConfig::default());
        assert!(search.search("   ", 5).await.unwrap().is_empty());
    }
}
