use crate::error::Result;
use crate::provider::EmbeddingProvider;
use async_trait::async_trait;
use sha2::{Digest, Sha256};

/// Deterministic, network-free [`EmbeddingProvider`] for tests: the same
/// text always produces the same vector, and different texts produce
/// different (if not semantically meaningful) vectors, which is enough
/// to exercise hybrid search's ranking logic without a live model.
pub struct MockEmbedder {
    model: String,
    dimension: usize,
}

impl MockEmbedder {
    #[must_use]
    pub fn new(dimension: usize) -> Self {
        Self {
            model: "mock-embedder-v1".to_string(),
            dimension,
        }
    }

    fn vector_for(&self, text: &str) -> Vec<f32> {
        let mut out = Vec::with_capacity(self.dimension);
        let mut counter: u32 = 0;
        while out.len() < self.dimension {
            let mut hasher = Sha256::new();
            hasher.update(text.as_bytes());
            hasher.update(counter.to_le_bytes());
            let digest = hasher.finalize();
            for chunk in digest.chunks_exact(4) {
                if out.len() == self.dimension {
                    break;
                }
                let bits = u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]);
                // Map to [-1.0, 1.0] so cosine similarity behaves sanely.
                out.push((bits as f32 / u32::MAX as f32) * 2.0 - 1.0);
            }
            counter += 1;
        }
        out
    }
}

#[async_trait]
impl EmbeddingProvider for MockEmbedder {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vector_for(t)).collect())
    }

    async fn embed_query(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vector_for(text))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn model_id(&self) -> &str {
        &self.model
    }

    async fn available(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn same_text_produces_same_vector() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed_query("fn main() {}").await.unwrap();
        let b = embedder.embed_query("fn main() {}").await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
    }

    #[tokio::test]
    async fn different_text_produces_different_vector() {
        let embedder = MockEmbedder::new(16);
        let a = embedder.embed_query("alpha").await.unwrap();
        let b = embedder.embed_query("beta").await.unwrap();
        assert_ne!(a, b);
    }

    #[tokio::test]
    async fn embed_batch_matches_embed_query_per_item() {
        let embedder = MockEmbedder::new(8);
        let batch = embedder
            .embed(&["one".to_string(), "two".to_string()])
            .await
            .unwrap();
        assert_eq!(batch[0], embedder.embed_query("one").await.unwrap());
        assert_eq!(batch[1], embedder.embed_query("two").await.unwrap());
    }
}
