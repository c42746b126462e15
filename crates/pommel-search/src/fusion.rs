use pommel_store::ScoredChunkId;
use std::collections::HashMap;

/// Reciprocal-rank fusion of a dense (vector) and a lexical ranked list
/// (§4.4). `k0` softens the influence of rank 1 versus rank 50 — a small
/// `k` makes the top of each list dominate, a large one flattens the
/// whole curve toward a tie.
#[derive(Debug, Clone, Copy)]
pub struct RRFFusion {
    pub dense_weight: f32,
    pub lexical_weight: f32,
    pub k0: f32,
}

impl Default for RRFFusion {
    fn default() -> Self {
        Self {
            dense_weight: 0.6,
            lexical_weight: 0.4,
            k0: 60.0,
        }
    }
}

impl RRFFusion {
    #[must_use]
    pub fn new(dense_weight: f32, lexical_weight: f32, k0: f32) -> Self {
        Self {
            dense_weight,
            lexical_weight,
            k0,
        }
    }

    /// Fuse two ranked lists into one, sorted by fused score descending,
    /// ties broken by `chunk_id` ascending so repeated searches over an
    /// unchanged index always come back in the same order (§3 invariant:
    /// deterministic tie-breaks at every stage).
    #[must_use]
    pub fn fuse(&self, dense: &[ScoredChunkId], lexical: &[ScoredChunkId]) -> Vec<(String, f32)> {
        let mut scores: HashMap<String, f32> = HashMap::new();

        for (rank, hit) in dense.iter().enumerate() {
            *scores.entry(hit.chunk_id.clone()).or_insert(0.0) += self.dense_weight / (self.k0 + rank as f32 + 1.0);
        }
        for (rank, hit) in lexical.iter().enumerate() {
            *scores.entry(hit.chunk_id.clone()).or_insert(0.0) += self.lexical_weight / (self.k0 + rank as f32 + 1.0);
        }

        let mut fused: Vec<(String, f32)> = scores.into_iter().collect();
        fused.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });
        fused
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hit(id: &str, score: f32) -> ScoredChunkId {
        ScoredChunkId {
            chunk_id: id.to_string(),
            score,
        }
    }

    #[test]
    fn fuse_ranks_items_in_both_lists_higher() {
        let fusion = RRFFusion::default();
        let dense = vec![hit("a", 0.9), hit("b", 0.5)];
        let lexical = vec![hit("b", 3.0), hit("c", 1.0)];
        let fused = fusion.fuse(&dense, &lexical);
        // "b" appears in both lists and should outrank a/c which each appear once.
        assert_eq!(fused[0].0, "b");
    }

    #[test]
    fn fuse_breaks_ties_by_chunk_id() {
        let fusion = RRFFusion::new(1.0, 0.0, 60.0);
        let dense = vec![hit("zeta", 1.0), hit("alpha", 1.0)];
        let fused = fusion.fuse(&dense, &[]);
        assert_eq!(fused[0].0, "alpha");
        assert_eq!(fused[1].0, "zeta");
    }

    #[test]
    fn empty_inputs_produce_empty_output() {
        let fusion = RRFFusion::default();
        assert!(fusion.fuse(&[], &[]).is_empty());
    }
}
