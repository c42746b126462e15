use thiserror::Error;

pub type Result<T> = std::result::Result<T, StoreError>;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("database at schema version {found}, expected {expected}; run a migration or delete the store")]
    SchemaVersionMismatch { found: i64, expected: i64 },

    #[error("database is corrupted: {0}")]
    Corrupted(String),

    #[error("embedding vector has wrong dimension: expected {expected}, got {found}")]
    DimensionMismatch { expected: usize, found: usize },

    #[error("{0}")]
    Other(String),
}
