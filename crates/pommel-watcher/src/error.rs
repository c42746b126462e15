use thiserror::Error;

pub type Result<T> = std::result::Result<T, WatcherError>;

#[derive(Error, Debug)]
pub enum WatcherError {
    #[error("filesystem watcher failed: {0}")]
    Notify(#[from] notify::Error),

    #[error("{0}")]
    Other(String),
}
