//! Pommel's per-project daemon: watches a project tree, keeps its index
//! up to date, and answers search requests over HTTP (§1, §6).

pub mod config;
pub mod error;
pub mod routes;
pub mod state;

use crate::config::{db_path, logs_dir, pid_path, pommel_dir, PommelConfig};
use crate::state::AppState;
use pommel_chunker::Chunker;
use pommel_embedder::{EmbeddingProvider, HttpEmbedder, HttpEmbedderConfig, MockEmbedder, ProviderKind};
use pommel_indexer::{Indexer, IndexerConfig};
use pommel_search::{
    FallbackReranker, HeuristicReranker, HybridSearch, HybridSearchConfig, RRFFusion, RemoteReranker, Reranker,
};
use pommel_store::Store;
use pommel_watcher::{FsWatcher, WatcherConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Build every long-lived component for a project root and return the
/// wired [`AppState`], without binding a listener or starting the
/// background loops — callers decide whether to [`spawn_background_tasks`]
/// and serve, or (in tests) just hit `routes::router` directly.
pub fn build_state(root: &Path, config: PommelConfig) -> anyhow::Result<(AppState, Arc<FsWatcherHandles>)> {
    std::fs::create_dir_all(pommel_dir(root))?;
    std::fs::create_dir_all(logs_dir(root))?;
    std::fs::write(pid_path(root), std::process::id().to_string())?;

    let store = Arc::new(Store::open(db_path(root))?);
    let chunker = Arc::new(Chunker::new()?);
    let embedder = build_embedder(&config)?;
    let reranker = build_reranker(&config);

    let hybrid_search = Arc::new(HybridSearch::new(
        Arc::clone(&store),
        Arc::clone(&embedder),
        reranker,
        HybridSearchConfig {
            rerank_pool_multiplier: 4,
            fusion: RRFFusion::new(config.search.dense_weight, config.search.lexical_weight, config.search.rrf_k),
        },
    ));

    let indexer = Arc::new(Indexer::new(
        root,
        Arc::clone(&store),
        chunker,
        Arc::clone(&embedder),
        IndexerConfig {
            chunk_concurrency: config.indexer.chunk_concurrency,
            embed_concurrency: config.indexer.embed_concurrency,
        },
    ));

    let (watcher, watcher_handle, event_queue) = FsWatcher::spawn(
        root,
        WatcherConfig {
            debounce: pommel_watcher::DebounceConfig {
                debounce: Duration::from_millis(config.watcher.debounce_ms),
                max_batch_wait: Duration::from_millis(config.watcher.max_batch_wait_ms),
            },
            queue_capacity: config.watcher.queue_capacity,
            drop_oldest: config.watcher.drop_oldest,
            ..WatcherConfig::default()
        },
    )?;

    let state = AppState {
        root: root.to_path_buf(),
        store,
        indexer,
        search: hybrid_search,
        event_queue: Some(Arc::clone(&event_queue)),
        config,
        started_at: Instant::now(),
        version: VERSION,
    };

    Ok((
        state,
        Arc::new(FsWatcherHandles {
            _watcher: watcher,
            _handle: watcher_handle,
            event_queue,
        }),
    ))
}

/// Keeps the notify watcher and its command handle alive for the
/// daemon's lifetime; dropping this tears the watcher down.
pub struct FsWatcherHandles {
    _watcher: FsWatcher,
    _handle: pommel_watcher::WatcherHandle,
    pub event_queue: Arc<pommel_watcher::EventBatchQueue>,
}

/// Starts the watcher-driven reindex loop and an initial background
/// index pass. Separate from [`build_state`] so tests can construct an
/// `AppState` without also starting a filesystem watcher thread.
pub fn spawn_background_tasks(state: &AppState, watcher: Arc<FsWatcherHandles>) {
    {
        let indexer = Arc::clone(&state.indexer);
        let event_queue = Arc::clone(&watcher.event_queue);
        tokio::spawn(async move {
            loop {
                let batch = event_queue.next_batch().await;
                log::info!("filesystem change batch of {} event(s), reindexing", batch.len());
                if let Err(err) = indexer.index_all(false).await {
                    log::warn!("reindex after filesystem change failed: {err}");
                }
            }
        });
    }

    let indexer = Arc::clone(&state.indexer);
    tokio::spawn(async move {
        match indexer.index_all(false).await {
            Ok(stats) => log::info!(
                "initial index complete: {} files scanned, {} changed, {} chunks",
                stats.files_scanned,
                stats.files_changed,
                stats.chunks_indexed
            ),
            Err(err) => log::error!("initial index failed: {err}"),
        }
    });
}

fn build_embedder(config: &PommelConfig) -> anyhow::Result<Arc<dyn EmbeddingProvider>> {
    let provider = match config.embedding.provider.as_str() {
        "ollama" => ProviderKind::Ollama,
        "ollama-remote" => ProviderKind::OllamaRemote,
        "openai" => ProviderKind::OpenAi,
        "voyage" => ProviderKind::Voyage,
        "mock" => {
            return Ok(Arc::new(MockEmbedder::new(config.embedding.dimension)));
        }
        other => anyhow::bail!("unknown embedding provider: {other}"),
    };

    let embedder = HttpEmbedder::new(HttpEmbedderConfig {
        provider,
        base_url: config.embedding.base_url.clone(),
        api_key: config.embedding.api_key.clone(),
        model: config.embedding.model.clone(),
        dimension: config.embedding.dimension,
        ..HttpEmbedderConfig::default()
    })?;
    Ok(Arc::new(embedder))
}

fn build_reranker(config: &PommelConfig) -> Box<dyn Reranker> {
    match config.search.reranker.as_str() {
        "remote" => config
            .search
            .remote_reranker_url
            .as_ref()
            .map(|url| Box::new(RemoteReranker::new(url.clone(), Duration::from_secs(5))) as Box<dyn Reranker>)
            .unwrap_or_else(|| Box::new(HeuristicReranker::new())),
        "remote-then-heuristic" => match &config.search.remote_reranker_url {
            Some(url) => Box::new(FallbackReranker::new(
                Box::new(RemoteReranker::new(url.clone(), Duration::from_secs(5))),
                Box::new(HeuristicReranker::new()),
            )),
            None => Box::new(HeuristicReranker::new()),
        },
        _ => Box::new(HeuristicReranker::new()),
    }
}

/// Resolve the project root to run the daemon against: the first CLI
/// argument, or the current directory.
#[must_use]
pub fn resolve_project_root() -> PathBuf {
    let root = std::env::args().nth(1).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("."));
    root.canonicalize().unwrap_or(root)
}
