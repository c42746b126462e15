use lru::LruCache;
use sha2::{Digest, Sha256};
use std::num::NonZeroUsize;
use std::sync::Mutex;

/// Bounded cache of previously computed embeddings, keyed by `(model_id,
/// text_hash)` (§4.3). Saves an HTTP round trip whenever the same chunk
/// content reappears — e.g. the same text embedded for two different
/// query templates, or a file whose chunks are byte-identical to a
/// sibling's.
pub struct EmbeddingCache {
    inner: Mutex<LruCache<(String, String), Vec<f32>>>,
}

impl EmbeddingCache {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity.max(1)).expect("capacity clamped to at least 1");
        Self {
            inner: Mutex::new(LruCache::new(capacity)),
        }
    }

    #[must_use]
    pub fn get(&self, model_id: &str, text: &str) -> Option<Vec<f32>> {
        let key = cache_key(model_id, text);
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).get(&key).cloned()
    }

    pub fn put(&self, model_id: &str, text: &str, vector: Vec<f32>) {
        let key = cache_key(model_id, text);
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).put(key, vector);
    }
}

fn cache_key(model_id: &str, text: &str) -> (String, String) {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    let hash = hasher.finalize();
    let text_hash = hash.iter().map(|b| format!("{b:02x}")).collect();
    (model_id.to_string(), text_hash)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_then_get_round_trips() {
        let cache = EmbeddingCache::new(4);
        cache.put("m1", "hello", vec![1.0, 2.0]);
        assert_eq!(cache.get("m1", "hello"), Some(vec![1.0, 2.0]));
    }

    #[test]
    fn different_models_do_not_share_entries() {
        let cache = EmbeddingCache::new(4);
        cache.put("m1", "hello", vec![1.0]);
        assert_eq!(cache.get("m2", "hello"), None);
    }

    #[test]
    fn eviction_drops_the_oldest_entry() {
        let cache = EmbeddingCache::new(1);
        cache.put("m1", "a", vec![1.0]);
        cache.put("m1", "b", vec![2.0]);
        assert_eq!(cache.get("m1", "a"), None);
        assert_eq!(cache.get("m1", "b"), Some(vec![2.0]));
    }
}
