use thiserror::Error;

pub type Result<T> = std::result::Result<T, IndexerError>;

#[derive(Error, Debug)]
pub enum IndexerError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Store(#[from] pommel_store::StoreError),

    #[error(transparent)]
    Embedder(#[from] pommel_embedder::EmbedderError),

    #[error(transparent)]
    Subproject(#[from] pommel_subproject::SubprojectError),

    #[error("indexer is busy with another reindex")]
    Busy,

    #[error("{0}")]
    Other(String),
}
