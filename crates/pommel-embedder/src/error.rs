use thiserror::Error;

pub type Result<T> = std::result::Result<T, EmbedderError>;

#[derive(Error, Debug)]
pub enum EmbedderError {
    #[error("embedding provider request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("embedding provider returned an unexpected response: {0}")]
    BadResponse(String),

    #[error("embedding provider unavailable: {0}")]
    Unavailable(String),

    #[error("embedding request timed out after {0:?}")]
    Timeout(std::time::Duration),

    #[error("embedding request cancelled")]
    Cancelled,

    #[error("{0}")]
    Other(String),
}
