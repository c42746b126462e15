//! Hybrid (dense + lexical) retrieval with reciprocal-rank fusion and a
//! two-stage reranker (§4.4).

mod error;
mod fusion;
mod fuzzy;
mod hybrid;
mod rerank;

pub use error::{Result, SearchError};
pub use fusion::RRFFusion;
pub use fuzzy::FuzzyScorer;
pub use hybrid::{HybridSearch, HybridSearchConfig};
pub use pommel_store::SearchFilters;
pub use rerank::{FallbackReranker, HeuristicReranker, RankedChunk, RemoteReranker, Reranker};
