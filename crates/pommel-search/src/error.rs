use thiserror::Error;

pub type Result<T> = std::result::Result<T, SearchError>;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error(transparent)]
    Store(#[from] pommel_store::StoreError),

    #[error(transparent)]
    Embedder(#[from] pommel_embedder::EmbedderError),

    #[error("reranker request failed: {0}")]
    Reranker(String),

    #[error("{0}")]
    Other(String),
}
