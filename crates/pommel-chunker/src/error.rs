use thiserror::Error;

pub type Result<T> = std::result::Result<T, ChunkerError>;

#[derive(Error, Debug)]
pub enum ChunkerError {
    #[error("chunker regex failed to compile: {0}")]
    Pattern(#[from] regex::Error),

    #[error("{0}")]
    Other(String),
}
