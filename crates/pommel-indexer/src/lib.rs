//! Drives the scan -> chunk -> embed -> persist cycle over a project
//! tree, incrementally by default and from scratch on a full reindex
//! (§4.5).

mod error;
mod indexer;
mod scanner;
mod state;
mod stats;

pub use error::{IndexerError, Result};
pub use indexer::{Indexer, IndexerConfig};
pub use scanner::{scan, ScannedFile};
pub use state::IndexerState;
pub use stats::{IndexStats, ThroughputTracker};
