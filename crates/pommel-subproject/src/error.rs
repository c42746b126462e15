use thiserror::Error;

pub type Result<T> = std::result::Result<T, SubprojectError>;

#[derive(Error, Debug)]
pub enum SubprojectError {
    #[error("io error walking project tree: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid glob pattern: {0}")]
    Glob(#[from] globset::Error),

    #[error("{0}")]
    Other(String),
}
