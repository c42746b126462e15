use crate::error::{IndexerError, Result};
use crate::scanner::{scan, ScannedFile};
use crate::state::IndexerState;
use crate::stats::IndexStats;
use pommel_chunker::{Chunk, Chunker, SourceFile};
use pommel_embedder::EmbeddingProvider;
use pommel_store::{FileRecord, Store};
use pommel_subproject::{containing_subproject, detect_subprojects, Subproject};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::{RwLock, Semaphore};
use tokio::task::JoinSet;

#[derive(Debug, Clone)]
pub struct IndexerConfig {
    /// Size of the CPU-bound chunking worker pool ("W" in §4.5).
    pub chunk_concurrency: usize,
    /// Size of the network-bound embedding worker pool ("E" in §4.5).
    pub embed_concurrency: usize,
}

impl Default for IndexerConfig {
    fn default() -> Self {
        Self {
            chunk_concurrency: 8,
            embed_concurrency: 4,
        }
    }
}

/// Drives the Idle -> Scanning -> Embedding -> Persisting cycle over one
/// project root (§4.5). Holds the only long-lived write handle onto the
/// [`Store`] the watcher-triggered loop and manual reindex requests both
/// funnel through, so two cycles for the same root never interleave.
pub struct Indexer {
    root: PathBuf,
    store: Arc<Store>,
    chunker: Arc<Chunker>,
    embedder: Arc<dyn EmbeddingProvider>,
    state: Arc<RwLock<IndexerState>>,
    busy: AtomicBool,
    config: IndexerConfig,
}

impl Indexer {
    #[must_use]
    pub fn new(
        root: impl Into<PathBuf>,
        store: Arc<Store>,
        chunker: Arc<Chunker>,
        embedder: Arc<dyn EmbeddingProvider>,
        config: IndexerConfig,
    ) -> Self {
        Self {
            root: root.into(),
            store,
            chunker,
            embedder,
            state: Arc::new(RwLock::new(IndexerState::Idle)),
            busy: AtomicBool::new(false),
            config,
        }
    }

    pub async fn state(&self) -> IndexerState {
        *self.state.read().await
    }

    /// Full or incremental reindex of the whole project tree. A caller
    /// overlapping with an in-flight cycle gets [`IndexerError::Busy`]
    /// rather than queuing — the watcher's debounce layer is what
    /// coalesces repeated triggers (DESIGN.md Open Question #2).
    pub async fn index_all(&self, full: bool) -> Result<IndexStats> {
        self.run_exclusive(|| async {
            let files = scan(&self.root)?;
            self.run_cycle(files, full, None).await
        })
        .await
    }

    /// Reindex only the files under `relative_path` (a file or
    /// directory), for a targeted `ReindexPath` request.
    pub async fn index_path(&self, relative_path: &str) -> Result<IndexStats> {
        self.run_exclusive(|| async {
            let target = self.root.join(relative_path);
            let files = scan(&self.root)?
                .into_iter()
                .filter(|f| f.path.starts_with(&target) || f.relative_path == relative_path)
                .collect();
            self.run_cycle(files, false, Some(relative_path.to_string())).await
        })
        .await
    }

    async fn run_exclusive<F, Fut>(&self, f: F) -> Result<IndexStats>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<IndexStats>>,
    {
        if self.busy.swap(true, Ordering::SeqCst) {
            return Err(IndexerError::Busy);
        }
        let result = f().await;
        self.busy.store(false, Ordering::SeqCst);
        *self.state.write().await = IndexerState::Idle;
        result
    }

    async fn set_state(&self, state: IndexerState) {
        *self.state.write().await = state;
    }

    async fn run_cycle(&self, files: Vec<ScannedFile>, full: bool, scope: Option<String>) -> Result<IndexStats> {
        let started = std::time::Instant::now();
        let mut stats = IndexStats {
            files_scanned: files.len(),
            ..IndexStats::default()
        };

        self.set_state(IndexerState::Scanning).await;
        let subprojects = detect_subprojects(&self.root)?;
        let model_id = self.embedder.model_id().to_string();

        let known = self
            .store
            .known_files()?
            .into_iter()
            .map(|f| (f.path.clone(), f))
            .collect::<std::collections::HashMap<_, _>>();

        let scanned_paths: HashSet<&str> = files.iter().map(|f| f.relative_path.as_str()).collect();

        // Files that disappeared from disk get purged, scoped to the
        // reindex target so a path-scoped reindex doesn't delete unrelated
        // history it never looked at.
        for (path, _) in &known {
            let in_scope = scope.as_deref().map(|s| path.starts_with(s)).unwrap_or(true);
            if in_scope && !scanned_paths.contains(path.as_str()) {
                self.store.delete_file(path)?;
                stats.files_removed += 1;
            }
        }

        // A changed mtime or an embedding model switch both warrant a
        // look; the content_hash comparison after chunking (§4.6 step 1)
        // is what actually decides whether the file did anything.
        let to_process: Vec<ScannedFile> = files
            .into_iter()
            .filter(|f| {
                full
                    || known
                        .get(&f.relative_path)
                        .map(|r| r.mtime_ms != f.mtime_ms || r.embedding_model != model_id)
                        .unwrap_or(true)
            })
            .collect();

        let chunk_semaphore = Arc::new(Semaphore::new(self.config.chunk_concurrency.max(1)));
        let mut chunk_tasks: JoinSet<Result<(ScannedFile, String, Vec<Chunk>)>> = JoinSet::new();
        for file in to_process {
            let chunker = Arc::clone(&self.chunker);
            let semaphore = Arc::clone(&chunk_semaphore);
            let subprojects = subprojects.clone();
            chunk_tasks.spawn(async move {
                let _permit = semaphore.acquire().await.expect("chunk semaphore closed");
                chunk_one_file(&chunker, &file, &subprojects)
            });
        }

        let mut chunked_files = Vec::new();
        while let Some(result) = chunk_tasks.join_next().await {
            match result {
                Ok(Ok(triple)) => chunked_files.push(triple),
                Ok(Err(err)) => stats.errors.push(err.to_string()),
                Err(join_err) => stats.errors.push(join_err.to_string()),
            }
        }

        // Compare each file's content_hash against its FileRecord and,
        // for files that actually changed, diff the chunk set against
        // what's already stored (§4.6 step 5): only chunks that are new
        // or whose content_hash moved need re-embedding.
        let mut diffs = Vec::new();
        for (file, file_hash, chunks) in chunked_files {
            let record = known.get(&file.relative_path);
            let unchanged =
                !full && record.map(|r| r.content_hash == file_hash && r.embedding_model == model_id).unwrap_or(false);
            if unchanged {
                let subproject_id = record.and_then(|r| r.subproject_id.clone());
                self.store.upsert_file(&FileRecord {
                    path: file.relative_path,
                    mtime_ms: file.mtime_ms,
                    size_bytes: file.size_bytes,
                    content_hash: file_hash,
                    embedding_model: model_id.clone(),
                    last_indexed: started.elapsed().as_millis() as i64,
                    subproject_id,
                })?;
                continue;
            }

            let previous = self.store.chunks_for_file(&file.relative_path)?;
            let previous_hashes: std::collections::HashMap<&str, &str> =
                previous.iter().map(|c| (c.id.as_str(), c.content_hash.as_str())).collect();
            let new_ids: HashSet<&str> = chunks.iter().map(|c| c.id.as_str()).collect();

            let to_embed: Vec<Chunk> = chunks
                .iter()
                .filter(|c| previous_hashes.get(c.id.as_str()).map(|hash| *hash != c.content_hash).unwrap_or(true))
                .cloned()
                .collect();
            let removed_ids: Vec<String> =
                previous.iter().filter(|c| !new_ids.contains(c.id.as_str())).map(|c| c.id.clone()).collect();

            stats.files_changed += 1;
            diffs.push(FileDiff { file, file_hash, chunks, to_embed, removed_ids });
        }

        self.set_state(IndexerState::Embedding).await;
        let embed_semaphore = Arc::new(Semaphore::new(self.config.embed_concurrency.max(1)));
        let mut embed_tasks: JoinSet<Result<(FileDiff, Vec<Vec<f32>>)>> = JoinSet::new();
        for diff in diffs {
            let embedder = Arc::clone(&self.embedder);
            let semaphore = Arc::clone(&embed_semaphore);
            embed_tasks.spawn(async move {
                let _permit = semaphore.acquire().await.expect("embed semaphore closed");
                let texts: Vec<String> = diff.to_embed.iter().map(|c| c.content.clone()).collect();
                let vectors = if texts.is_empty() { Vec::new() } else { embedder.embed(&texts).await? };
                Ok((diff, vectors))
            });
        }

        self.set_state(IndexerState::Persisting).await;
        while let Some(result) = embed_tasks.join_next().await {
            match result {
                Ok(Ok((diff, vectors))) => {
                    self.store.apply_chunk_diff(&diff.chunks, &diff.removed_ids)?;
                    for (chunk, vector) in diff.to_embed.iter().zip(vectors.iter()) {
                        self.store.upsert_embedding(&chunk.id, &model_id, vector)?;
                    }
                    stats.chunks_indexed += diff.chunks.len();
                    stats.embeddings_computed += vectors.len();

                    let subproject_id = containing_subproject(&diff.file.relative_path, &subprojects).map(|s| s.id.clone());
                    self.store.upsert_file(&FileRecord {
                        path: diff.file.relative_path,
                        mtime_ms: diff.file.mtime_ms,
                        size_bytes: diff.file.size_bytes,
                        content_hash: diff.file_hash,
                        embedding_model: model_id.clone(),
                        last_indexed: started.elapsed().as_millis() as i64,
                        subproject_id,
                    })?;
                }
                Ok(Err(err)) => stats.errors.push(err.to_string()),
                Err(join_err) => stats.errors.push(join_err.to_string()),
            }
        }

        for subproject in &subprojects {
            self.store.upsert_subproject(&pommel_store::SubprojectRecord {
                id: subproject.id.clone(),
                path: subproject.path.clone(),
                name: subproject.name.clone(),
                marker_kind: subproject.marker_kind.clone(),
                priority: subproject.priority,
            })?;
        }

        stats.duration_ms = started.elapsed().as_millis().max(1) as u64;
        Ok(stats)
    }
}

/// One file's chunk-level set difference against what the Store already
/// holds (§4.6 step 5): `chunks` is the file's complete new chunk set
/// (written in full so row metadata like `last_modified` stays current),
/// `to_embed` is the subset whose content actually changed, and
/// `removed_ids` are chunks that no longer exist in the file.
struct FileDiff {
    file: ScannedFile,
    file_hash: String,
    chunks: Vec<Chunk>,
    to_embed: Vec<Chunk>,
    removed_ids: Vec<String>,
}

fn chunk_one_file(
    chunker: &Chunker,
    file: &ScannedFile,
    subprojects: &[Subproject],
) -> Result<(ScannedFile, String, Vec<Chunk>)> {
    let content = read_text_file(&file.path)?;
    let file_hash = pommel_chunker::content_hash(&content);
    let source = SourceFile::new(&file.relative_path, content, file.mtime_ms.max(0) as u64);
    let mut chunks = chunker.chunk(&source);

    if let Some(subproject) = containing_subproject(&file.relative_path, subprojects) {
        for chunk in &mut chunks {
            chunk.subproject_id = Some(subproject.id.clone());
            chunk.subproject_path = Some(subproject.path.clone());
        }
    }

    Ok((file.clone(), file_hash, chunks))
}

/// Reads a file as UTF-8, skipping (empty chunk list, not an error)
/// anything that isn't valid text — binary assets have no chunks to
/// extract and shouldn't abort the whole cycle (§4.2 edge case).
fn read_text_file(path: &Path) -> Result<String> {
    match std::fs::read(path) {
        Ok(bytes) => Ok(String::from_utf8_lossy(&bytes).into_owned()),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(String::new()),
        Err(err) => Err(IndexerError::Io(err)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pommel_embedder::MockEmbedder;
    use std::fs;
    use tempfile::TempDir;

    fn test_indexer(root: &Path) -> Indexer {
        let store = Arc::new(Store::open_in_memory().unwrap());
        let chunker = Arc::new(Chunker::new().unwrap());
        let embedder: Arc<dyn EmbeddingProvider> = Arc::new(MockEmbedder::new(16));
        Indexer::new(root, store, chunker, embedder, IndexerConfig::default())
    }

    #[tokio::test]
    async fn index_all_chunks_and_embeds_every_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
        fs::write(dir.path().join("b.rs"), "fn b() {}").unwrap();

        let indexer = test_indexer(dir.path());
        let stats = indexer.index_all(true).await.unwrap();

        assert_eq!(stats.files_scanned, 2);
        assert_eq!(stats.files_changed, 2);
        assert!(stats.chunks_indexed >= 2);
        assert_eq!(stats.embeddings_computed, stats.chunks_indexed);
        assert!(stats.errors.is_empty());
        assert_eq!(indexer.state().await, IndexerState::Idle);
    }

    #[tokio::test]
    async fn incremental_reindex_skips_unchanged_files() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();

        let indexer = test_indexer(dir.path());
        indexer.index_all(true).await.unwrap();
        let second = indexer.index_all(false).await.unwrap();

        assert_eq!(second.files_changed, 0);
    }

    #[tokio::test]
    async fn touching_a_file_without_changing_content_skips_reembedding() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.rs");
        fs::write(&path, "fn a() {}").unwrap();

        let indexer = test_indexer(dir.path());
        let first = indexer.index_all(true).await.unwrap();
        assert!(first.embeddings_computed > 0);

        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(&path, "fn a() {}").unwrap();
        let second = indexer.index_all(false).await.unwrap();
        assert_eq!(second.embeddings_computed, 0);
    }

    #[tokio::test]
    async fn only_the_changed_chunk_is_reembedded() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.rs");
        fs::write(&path, "fn a() {}\nfn b() {}\n").unwrap();

        let indexer = test_indexer(dir.path());
        let first = indexer.index_all(true).await.unwrap();
        assert_eq!(first.embeddings_computed, first.chunks_indexed);

        std::thread::sleep(std::time::Duration::from_millis(10));
        fs::write(&path, "fn a() { 1 }\nfn b() {}\n").unwrap();
        let second = indexer.index_all(false).await.unwrap();
        assert!(second.embeddings_computed > 0);
        assert!(second.embeddings_computed < second.chunks_indexed);
    }

    #[tokio::test]
    async fn concurrent_reindex_is_rejected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("a.rs"), "fn a() {}").unwrap();
        let indexer = Arc::new(test_indexer(dir.path()));

        indexer.busy.store(true, Ordering::SeqCst);
        let err = indexer.index_all(true).await.unwrap_err();
        assert!(matches!(err, IndexerError::Busy));
    }

    #[tokio::test]
    async fn removed_file_is_purged_on_full_reindex() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("a.rs");
        fs::write(&path, "fn a() {}").unwrap();

        let indexer = test_indexer(dir.path());
        indexer.index_all(true).await.unwrap();

        fs::remove_file(&path).unwrap();
        let stats = indexer.index_all(true).await.unwrap();
        assert_eq!(stats.files_removed, 1);
    }
}
