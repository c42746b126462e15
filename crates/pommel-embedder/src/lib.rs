//! Client for the external embedding provider Pommel's indexer and
//! search pipeline call out to (§4.3). Exposes one capability-set trait,
//! [`EmbeddingProvider`], with a real HTTP-backed implementation and a
//! deterministic mock for tests.

mod cache;
mod cancel;
mod error;
mod http;
mod mock;
mod provider;

pub use cache::EmbeddingCache;
pub use cancel::{CancelHandle, CancelToken};
pub use error::{EmbedderError, Result};
pub use http::{HttpEmbedder, HttpEmbedderConfig, ProviderKind};
pub use mock::MockEmbedder;
pub use provider::EmbeddingProvider;
