use crate::config::PommelConfig;
use pommel_indexer::Indexer;
use pommel_search::HybridSearch;
use pommel_store::Store;
use pommel_watcher::EventBatchQueue;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

/// Shared state every HTTP handler reads from (§6 External interfaces).
/// Construction (wiring Store/Indexer/HybridSearch together) lives in
/// `build_state`; this struct just holds the already-built pieces.
#[derive(Clone)]
pub struct AppState {
    pub root: PathBuf,
    pub store: Arc<Store>,
    pub indexer: Arc<Indexer>,
    pub search: Arc<HybridSearch>,
    pub event_queue: Option<Arc<EventBatchQueue>>,
    pub config: PommelConfig,
    pub started_at: Instant,
    pub version: &'static str,
}
