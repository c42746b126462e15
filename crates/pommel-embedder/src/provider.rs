use crate::error::Result;
use async_trait::async_trait;

/// Capability-set for an embedding backend (§4.3, §9 Design Notes: prefer
/// a capability-set trait over an inheritance hierarchy of embedder
/// types). Implementations may be a remote HTTP service
/// ([`crate::HttpEmbedder`]) or an in-process test double
/// ([`crate::MockEmbedder`]).
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of document texts (e.g. chunk content).
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Embed a single search query. Kept distinct from [`Self::embed`]
    /// because some providers use an asymmetric query/document template
    /// (§4.3).
    async fn embed_query(&self, text: &str) -> Result<Vec<f32>>;

    /// Dimensionality of vectors this provider returns, for the Store's
    /// `dimension` column and `DimensionMismatch` validation.
    fn dimension(&self) -> usize;

    /// Stable identifier persisted alongside embeddings so a model change
    /// doesn't silently mix incompatible vectors in one search.
    fn model_id(&self) -> &str;

    /// Cheap reachability probe surfaced at `/status` and `/health`.
    async fn available(&self) -> bool;
}
