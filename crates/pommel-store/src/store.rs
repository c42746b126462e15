use crate::error::{Result, StoreError};
use crate::schema::init_schema;
use crate::vector::{cosine_similarity, pack_f32, unpack_f32};
use pommel_chunker::{Chunk, Level};
use rusqlite::{params, Connection, OptionalExtension};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::Mutex;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileRecord {
    pub path: String,
    pub mtime_ms: i64,
    pub size_bytes: i64,
    pub content_hash: String,
    pub embedding_model: String,
    pub last_indexed: i64,
    pub subproject_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubprojectRecord {
    pub id: String,
    pub path: String,
    pub name: String,
    pub marker_kind: String,
    pub priority: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct StoreStats {
    pub file_count: i64,
    pub chunk_count: i64,
    pub embedding_count: i64,
    pub subproject_count: i64,
}

/// A scored hit from [`Store::vector_search`] or [`Store::lexical_search`],
/// before hybrid fusion combines the two (§4.4).
#[derive(Debug, Clone)]
pub struct ScoredChunkId {
    pub chunk_id: String,
    pub score: f32,
}

/// Predicates shared by [`Store::vector_search`] and [`Store::lexical_search`];
/// every field pushes down into the SQL query rather than filtering the
/// hydrated results afterward, so a filtered search never pays to score
/// candidates it's going to discard.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub levels: Vec<String>,
    pub path_prefix: Option<String>,
    pub subproject_ids: Vec<String>,
    pub languages: Vec<String>,
}

impl SearchFilters {
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
            && self.path_prefix.is_none()
            && self.subproject_ids.is_empty()
            && self.languages.is_empty()
    }

    fn to_sql(&self) -> (String, Vec<Box<dyn rusqlite::ToSql>>) {
        let mut clause = String::new();
        let mut params: Vec<Box<dyn rusqlite::ToSql>> = Vec::new();
        push_in_clause(&mut clause, &mut params, "c.level", &self.levels);
        push_in_clause(&mut clause, &mut params, "c.subproject_id", &self.subproject_ids);
        push_in_clause(&mut clause, &mut params, "c.language", &self.languages);
        if let Some(prefix) = &self.path_prefix {
            clause.push_str(" AND c.file_path LIKE ? ESCAPE '\\'");
            params.push(Box::new(format!("{}%", escape_like(prefix))));
        }
        (clause, params)
    }
}

fn push_in_clause(clause: &mut String, params: &mut Vec<Box<dyn rusqlite::ToSql>>, column: &str, values: &[String]) {
    if values.is_empty() {
        return;
    }
    clause.push_str(" AND ");
    clause.push_str(column);
    clause.push_str(" IN (");
    for (i, value) in values.iter().enumerate() {
        if i > 0 {
            clause.push(',');
        }
        clause.push('?');
        params.push(Box::new(value.clone()));
    }
    clause.push(')');
}

/// Escapes `LIKE` wildcards so a literal `_` or `%` in a path prefix isn't
/// treated as a pattern.
fn escape_like(s: &str) -> String {
    s.replace('\\', "\\\\").replace('%', "\\%").replace('_', "\\_")
}

/// Transactional chunk storage backed by SQLite. Single-writer/many-reader
/// discipline is enforced at the application layer (§5): the indexer holds
/// the only long-lived handle that issues writes, routed through a mutex
/// so concurrent HTTP search requests never race a write transaction.
pub struct Store {
    conn: Mutex<Connection>,
}

impl Store {
    pub fn open(db_path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(db_path.as_ref())?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    /// In-memory store for tests: same schema, no file on disk.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self { conn: Mutex::new(conn) })
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Connection> {
        self.conn.lock().unwrap_or_else(std::sync::PoisonError::into_inner)
    }

    // -- files -----------------------------------------------------------

    pub fn upsert_file(&self, record: &FileRecord) -> Result<()> {
        self.lock().execute(
            "INSERT INTO files(path, mtime_ms, size_bytes, content_hash, embedding_model, last_indexed, subproject_id)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
             ON CONFLICT(path) DO UPDATE SET
               mtime_ms = excluded.mtime_ms,
               size_bytes = excluded.size_bytes,
               content_hash = excluded.content_hash,
               embedding_model = excluded.embedding_model,
               last_indexed = excluded.last_indexed,
               subproject_id = excluded.subproject_id",
            params![
                record.path,
                record.mtime_ms,
                record.size_bytes,
                record.content_hash,
                record.embedding_model,
                record.last_indexed,
                record.subproject_id,
            ],
        )?;
        Ok(())
    }

    pub fn get_file(&self, path: &str) -> Result<Option<FileRecord>> {
        self.lock()
            .query_row(
                "SELECT path, mtime_ms, size_bytes, content_hash, embedding_model, last_indexed, subproject_id
                 FROM files WHERE path = ?1",
                [path],
                row_to_file_record,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn delete_file(&self, path: &str) -> Result<()> {
        let conn = self.lock();
        conn.execute("DELETE FROM chunks WHERE file_path = ?1", [path])?;
        conn.execute("DELETE FROM files WHERE path = ?1", [path])?;
        Ok(())
    }

    pub fn known_files(&self) -> Result<Vec<FileRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT path, mtime_ms, size_bytes, content_hash, embedding_model, last_indexed, subproject_id FROM files",
        )?;
        let rows = stmt.query_map([], row_to_file_record)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // -- chunks ------------------------------------------------------------

    /// Replace every chunk belonging to `file_path` with `chunks` in one
    /// transaction, so a reader never observes a half-updated file (§4.1
    /// "a file's chunks are replaced atomically").
    pub fn replace_file_chunks(&self, file_path: &str, chunks: &[Chunk]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM chunks WHERE file_path = ?1", [file_path])?;
        for chunk in chunks {
            insert_chunk(&tx, chunk)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn upsert_chunks(&self, chunks: &[Chunk]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for chunk in chunks {
            insert_chunk(&tx, chunk)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn delete_chunks_by_ids(&self, ids: &[String]) -> Result<()> {
        let conn = self.lock();
        for id in ids {
            conn.execute("DELETE FROM chunks WHERE id = ?1", [id])?;
        }
        Ok(())
    }

    /// Applies a per-file chunk-level diff in one transaction (§4.6 step
    /// 5/6): `removed_ids` are deleted (cascading to their embeddings),
    /// `upserts` are inserted or updated in place. Leaving unchanged
    /// chunks untouched is the caller's job — only pass the chunks that
    /// actually need writing.
    pub fn apply_chunk_diff(&self, upserts: &[Chunk], removed_ids: &[String]) -> Result<()> {
        let mut conn = self.lock();
        let tx = conn.transaction()?;
        for id in removed_ids {
            tx.execute("DELETE FROM chunks WHERE id = ?1", [id])?;
        }
        for chunk in upserts {
            insert_chunk(&tx, chunk)?;
        }
        tx.commit()?;
        Ok(())
    }

    pub fn get_chunk(&self, id: &str) -> Result<Option<Chunk>> {
        self.lock()
            .query_row(
                "SELECT id, file_path, level, start_line, end_line, language, name, signature,
                        content, content_hash, parent_id, subproject_id, subproject_path, last_modified
                 FROM chunks WHERE id = ?1",
                [id],
                row_to_chunk,
            )
            .optional()
            .map_err(StoreError::from)
    }

    pub fn get_chunks(&self, ids: &[String]) -> Result<Vec<Chunk>> {
        let mut out = Vec::with_capacity(ids.len());
        for id in ids {
            if let Some(chunk) = self.get_chunk(id)? {
                out.push(chunk);
            }
        }
        Ok(out)
    }

    pub fn chunks_for_file(&self, file_path: &str) -> Result<Vec<Chunk>> {
        let conn = self.lock();
        let mut stmt = conn.prepare(
            "SELECT id, file_path, level, start_line, end_line, language, name, signature,
                    content, content_hash, parent_id, subproject_id, subproject_path, last_modified
             FROM chunks WHERE file_path = ?1 ORDER BY start_line ASC",
        )?;
        let rows = stmt.query_map([file_path], row_to_chunk)?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // -- embeddings --------------------------------------------------------

    pub fn upsert_embedding(&self, chunk_id: &str, model_id: &str, vector: &[f32]) -> Result<()> {
        let packed = pack_f32(vector);
        self.lock().execute(
            "INSERT INTO embeddings(chunk_id, model_id, dimension, vector) VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(chunk_id, model_id) DO UPDATE SET
               dimension = excluded.dimension,
               vector = excluded.vector",
            params![chunk_id, model_id, vector.len() as i64, packed],
        )?;
        Ok(())
    }

    pub fn delete_embeddings_by_chunk(&self, chunk_id: &str) -> Result<()> {
        self.lock().execute("DELETE FROM embeddings WHERE chunk_id = ?1", [chunk_id])?;
        Ok(())
    }

    /// Brute-force cosine-similarity search over every embedding for
    /// `model_id`. Acceptable at the per-project scale Pommel targets
    /// (§1 Non-goals: no distributed index); replace with an ANN index
    /// only if a project's chunk count makes this the bottleneck.
    pub fn vector_search(
        &self,
        model_id: &str,
        query: &[f32],
        filters: &SearchFilters,
        limit: usize,
    ) -> Result<Vec<ScoredChunkId>> {
        let conn = self.lock();
        let (filter_clause, filter_params) = filters.to_sql();
        let sql = format!(
            "SELECT e.chunk_id, e.vector FROM embeddings e \
             JOIN chunks c ON c.id = e.chunk_id \
             WHERE e.model_id = ?{filter_clause}"
        );
        let mut stmt = conn.prepare(&sql)?;
        let mut params: Vec<&dyn rusqlite::ToSql> = vec![&model_id];
        params.extend(filter_params.iter().map(|p| p.as_ref()));
        let rows = stmt.query_map(params.as_slice(), |row| {
            let chunk_id: String = row.get(0)?;
            let blob: Vec<u8> = row.get(1)?;
            Ok((chunk_id, blob))
        })?;

        let mut scored: Vec<ScoredChunkId> = Vec::new();
        for row in rows {
            let (chunk_id, blob) = row?;
            let vector = unpack_f32(&blob);
            let score = cosine_similarity(query, &vector);
            scored.push(ScoredChunkId { chunk_id, score });
        }
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        scored.truncate(limit);
        Ok(scored)
    }

    /// FTS5 match against name/signature/content, ranked by `bm25()`
    /// (lower is better in SQLite's convention) and converted to a
    /// higher-is-better score by negating, so callers treat every ranked
    /// list from the Store the same way.
    pub fn lexical_search(&self, query: &str, filters: &SearchFilters, limit: usize) -> Result<Vec<ScoredChunkId>> {
        if query.trim().is_empty() {
            return Ok(Vec::new());
        }
        let conn = self.lock();
        let (filter_clause, filter_params) = filters.to_sql();
        let sql = format!(
            "SELECT f.chunk_id, bm25(chunks_fts, 1.0, 2.0, 1.5) AS rank
             FROM chunks_fts f
             JOIN chunks c ON c.id = f.chunk_id
             WHERE f MATCH ?{filter_clause}
             ORDER BY rank ASC, f.chunk_id ASC LIMIT ?"
        );
        let mut stmt = conn.prepare(&sql)?;
        let query_text = fts_query(query);
        let limit = limit as i64;
        let mut params: Vec<&dyn rusqlite::ToSql> = vec![&query_text];
        params.extend(filter_params.iter().map(|p| p.as_ref()));
        params.push(&limit);
        let rows = stmt.query_map(params.as_slice(), |row| {
            let chunk_id: String = row.get(0)?;
            let rank: f64 = row.get(1)?;
            Ok(ScoredChunkId {
                chunk_id,
                score: -rank as f32,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // -- subprojects ---------------------------------------------------

    pub fn upsert_subproject(&self, record: &SubprojectRecord) -> Result<()> {
        self.lock().execute(
            "INSERT INTO subprojects(id, path, name, marker_kind, priority) VALUES (?1, ?2, ?3, ?4, ?5)
             ON CONFLICT(id) DO UPDATE SET
               path = excluded.path, name = excluded.name,
               marker_kind = excluded.marker_kind, priority = excluded.priority",
            params![record.id, record.path, record.name, record.marker_kind, record.priority],
        )?;
        Ok(())
    }

    pub fn list_subprojects(&self) -> Result<Vec<SubprojectRecord>> {
        let conn = self.lock();
        let mut stmt = conn.prepare("SELECT id, path, name, marker_kind, priority FROM subprojects ORDER BY priority DESC")?;
        let rows = stmt.query_map([], |row| {
            Ok(SubprojectRecord {
                id: row.get(0)?,
                path: row.get(1)?,
                name: row.get(2)?,
                marker_kind: row.get(3)?,
                priority: row.get(4)?,
            })
        })?;
        rows.collect::<rusqlite::Result<Vec<_>>>().map_err(StoreError::from)
    }

    // -- stats -----------------------------------------------------------

    pub fn stats(&self) -> Result<StoreStats> {
        let conn = self.lock();
        let file_count = conn.query_row("SELECT COUNT(*) FROM files", [], |r| r.get(0))?;
        let chunk_count = conn.query_row("SELECT COUNT(*) FROM chunks", [], |r| r.get(0))?;
        let embedding_count = conn.query_row("SELECT COUNT(*) FROM embeddings", [], |r| r.get(0))?;
        let subproject_count = conn.query_row("SELECT COUNT(*) FROM subprojects", [], |r| r.get(0))?;
        Ok(StoreStats {
            file_count,
            chunk_count,
            embedding_count,
            subproject_count,
        })
    }
}

fn insert_chunk(conn: &Connection, chunk: &Chunk) -> rusqlite::Result<()> {
    conn.execute(
        "INSERT INTO chunks(id, file_path, level, start_line, end_line, language, name, signature,
                             content, content_hash, parent_id, subproject_id, subproject_path, last_modified)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
         ON CONFLICT(id) DO UPDATE SET
           file_path = excluded.file_path, level = excluded.level,
           start_line = excluded.start_line, end_line = excluded.end_line,
           language = excluded.language, name = excluded.name, signature = excluded.signature,
           content = excluded.content, content_hash = excluded.content_hash,
           parent_id = excluded.parent_id, subproject_id = excluded.subproject_id,
           subproject_path = excluded.subproject_path, last_modified = excluded.last_modified",
        params![
            chunk.id,
            chunk.file_path,
            chunk.level.as_str(),
            chunk.start_line as i64,
            chunk.end_line as i64,
            chunk.language,
            chunk.name,
            chunk.signature,
            chunk.content,
            chunk.content_hash,
            chunk.parent_id,
            chunk.subproject_id,
            chunk.subproject_path,
            chunk.last_modified as i64,
        ],
    )?;
    Ok(())
}

fn row_to_chunk(row: &rusqlite::Row<'_>) -> rusqlite::Result<Chunk> {
    let level_str: String = row.get(2)?;
    let level = Level::parse(&level_str).unwrap_or(Level::File);
    Ok(Chunk {
        id: row.get(0)?,
        file_path: row.get(1)?,
        level,
        start_line: row.get::<_, i64>(3)? as usize,
        end_line: row.get::<_, i64>(4)? as usize,
        language: row.get(5)?,
        name: row.get(6)?,
        signature: row.get(7)?,
        content: row.get(8)?,
        content_hash: row.get(9)?,
        parent_id: row.get(10)?,
        subproject_id: row.get(11)?,
        subproject_path: row.get(12)?,
        last_modified: row.get::<_, i64>(13)? as u64,
    })
}

fn row_to_file_record(row: &rusqlite::Row<'_>) -> rusqlite::Result<FileRecord> {
    Ok(FileRecord {
        path: row.get(0)?,
        mtime_ms: row.get(1)?,
        size_bytes: row.get(2)?,
        content_hash: row.get(3)?,
        embedding_model: row.get(4)?,
        last_indexed: row.get(5)?,
        subproject_id: row.get(6)?,
    })
}

/// Quote the query as an FTS5 string literal so tokens like `a-b` or
/// `fn(` don't get parsed as FTS5 query-syntax operators.
fn fts_query(query: &str) -> String {
    format!("\"{}\"", query.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_chunk(id: &str, file_path: &str, content: &str) -> Chunk {
        Chunk::new(
            file_path.to_string(),
            Level::Method,
            1,
            10,
            content.to_string(),
            Some("rust".to_string()),
            Some(id.to_string()),
            None,
            0,
        )
    }

    #[test]
    fn upsert_and_fetch_chunk_round_trips() {
        let store = Store::open_in_memory().unwrap();
        let chunk = sample_chunk("widget_new", "src/widget.rs", "fn new() -> Self {}");
        store.upsert_chunks(std::slice::from_ref(&chunk)).unwrap();
        let fetched = store.get_chunk(&chunk.id).unwrap().unwrap();
        assert_eq!(fetched.content, chunk.content);
    }

    #[test]
    fn replace_file_chunks_is_atomic_per_file() {
        let store = Store::open_in_memory().unwrap();
        let c1 = sample_chunk("a", "src/a.rs", "fn a() {}");
        store.replace_file_chunks("src/a.rs", &[c1]).unwrap();
        assert_eq!(store.chunks_for_file("src/a.rs").unwrap().len(), 1);

        let c2 = sample_chunk("b", "src/a.rs", "fn b() {}");
        store.replace_file_chunks("src/a.rs", &[c2]).unwrap();
        let chunks = store.chunks_for_file("src/a.rs").unwrap();
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].content, "fn b() {}");
    }

    #[test]
    fn lexical_search_finds_matching_content() {
        let store = Store::open_in_memory().unwrap();
        let chunk = sample_chunk("greeter", "src/greet.rs", "fn greet_user(name: &str) -> String");
        store.upsert_chunks(std::slice::from_ref(&chunk)).unwrap();
        let hits = store.lexical_search("greet_user", &SearchFilters::default(), 10).unwrap();
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].chunk_id, chunk.id);
    }

    #[test]
    fn deleting_file_removes_fts_entries() {
        let store = Store::open_in_memory().unwrap();
        let chunk = sample_chunk("ephemeral", "src/gone.rs", "fn vanish() {}");
        store.upsert_chunks(std::slice::from_ref(&chunk)).unwrap();
        store.delete_file("src/gone.rs").unwrap();
        assert!(store.lexical_search("vanish", &SearchFilters::default(), 10).unwrap().is_empty());
    }

    #[test]
    fn vector_search_ranks_by_cosine_similarity() {
        let store = Store::open_in_memory().unwrap();
        let near = sample_chunk("near", "src/near.rs", "fn near() {}");
        let far = sample_chunk("far", "src/far.rs", "fn far() {}");
        store.upsert_chunks(&[near.clone(), far.clone()]).unwrap();
        store.upsert_embedding(&near.id, "mock", &[1.0, 0.0, 0.0]).unwrap();
        store.upsert_embedding(&far.id, "mock", &[0.0, 1.0, 0.0]).unwrap();

        let hits = store.vector_search("mock", &[0.9, 0.1, 0.0], &SearchFilters::default(), 10).unwrap();
        assert_eq!(hits[0].chunk_id, near.id);
    }

    #[test]
    fn empty_query_returns_no_lexical_hits() {
        let store = Store::open_in_memory().unwrap();
        assert!(store.lexical_search("   ", &SearchFilters::default(), 10).unwrap().is_empty());
    }
}
