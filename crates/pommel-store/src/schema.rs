use crate::error::{Result, StoreError};
use rusqlite::Connection;

/// Bumped whenever the table layout changes in a way old rows can't read.
/// A mismatch at open time is reported as [`StoreError::SchemaVersionMismatch`]
/// rather than silently migrated, since Pommel has no data worth preserving
/// across an incompatible layout change — the index is a disposable cache
/// of the project's source tree.
pub const SCHEMA_VERSION: i64 = 1;

pub fn init_schema(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        r#"
        PRAGMA journal_mode = WAL;
        PRAGMA foreign_keys = ON;

        CREATE TABLE IF NOT EXISTS meta (
            key   TEXT PRIMARY KEY,
            value TEXT NOT NULL
        );

        CREATE TABLE IF NOT EXISTS files (
            path          TEXT PRIMARY KEY,
            mtime_ms      INTEGER NOT NULL,
            size_bytes    INTEGER NOT NULL,
            content_hash  TEXT NOT NULL,
            embedding_model TEXT NOT NULL,
            last_indexed  INTEGER NOT NULL,
            subproject_id TEXT
        );

        CREATE TABLE IF NOT EXISTS subprojects (
            id          TEXT PRIMARY KEY,
            path        TEXT NOT NULL UNIQUE,
            name        TEXT NOT NULL,
            marker_kind TEXT NOT NULL,
            priority    INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS chunks (
            id              TEXT PRIMARY KEY,
            file_path       TEXT NOT NULL,
            level           TEXT NOT NULL,
            start_line      INTEGER NOT NULL,
            end_line        INTEGER NOT NULL,
            language        TEXT,
            name            TEXT,
            signature       TEXT,
            content         TEXT NOT NULL,
            content_hash    TEXT NOT NULL,
            parent_id       TEXT,
            subproject_id   TEXT,
            subproject_path TEXT,
            last_modified   INTEGER NOT NULL
        );

        CREATE INDEX IF NOT EXISTS idx_chunks_file_path ON chunks(file_path);
        CREATE INDEX IF NOT EXISTS idx_chunks_subproject_id ON chunks(subproject_id);
        CREATE INDEX IF NOT EXISTS idx_chunks_parent_id ON chunks(parent_id);

        CREATE TABLE IF NOT EXISTS embeddings (
            chunk_id  TEXT NOT NULL,
            model_id  TEXT NOT NULL,
            dimension INTEGER NOT NULL,
            vector    BLOB NOT NULL,
            PRIMARY KEY (chunk_id, model_id),
            FOREIGN KEY (chunk_id) REFERENCES chunks(id) ON DELETE CASCADE
        );

        CREATE INDEX IF NOT EXISTS idx_embeddings_model_id ON embeddings(model_id);

        CREATE VIRTUAL TABLE IF NOT EXISTS chunks_fts USING fts5(
            chunk_id UNINDEXED,
            file_path UNINDEXED,
            name,
            signature,
            content
        );

        CREATE TRIGGER IF NOT EXISTS chunks_ai AFTER INSERT ON chunks BEGIN
            INSERT INTO chunks_fts(chunk_id, file_path, name, signature, content)
            VALUES (new.id, new.file_path, new.name, new.signature, new.content);
        END;

        CREATE TRIGGER IF NOT EXISTS chunks_ad AFTER DELETE ON chunks BEGIN
            DELETE FROM chunks_fts WHERE chunk_id = old.id;
        END;

        CREATE TRIGGER IF NOT EXISTS chunks_au AFTER UPDATE ON chunks BEGIN
            DELETE FROM chunks_fts WHERE chunk_id = old.id;
            INSERT INTO chunks_fts(chunk_id, file_path, name, signature, content)
            VALUES (new.id, new.file_path, new.name, new.signature, new.content);
        END;
        "#,
    )?;

    let version: Option<i64> = conn
        .query_row("SELECT value FROM meta WHERE key = 'schema_version'", [], |row| {
            row.get::<_, String>(0)
        })
        .ok()
        .and_then(|v| v.parse().ok());

    match version {
        None => {
            conn.execute(
                "INSERT INTO meta(key, value) VALUES ('schema_version', ?1)",
                [SCHEMA_VERSION.to_string()],
            )?;
        }
        Some(found) if found != SCHEMA_VERSION => {
            return Err(StoreError::SchemaVersionMismatch {
                found,
                expected: SCHEMA_VERSION,
            });
        }
        Some(_) => {}
    }

    Ok(())
}
