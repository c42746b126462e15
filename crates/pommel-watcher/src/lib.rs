//! Recursive filesystem watching with debouncing and a bounded,
//! backpressure-aware handoff to the indexer (§4.5).

mod debounce;
mod error;
mod event;
mod queue;
mod watcher;

pub use debounce::{DebounceConfig, DebounceState};
pub use error::{Result, WatcherError};
pub use event::{is_relevant_path, FileEvent};
pub use queue::EventBatchQueue;
pub use watcher::{FsWatcher, WatcherConfig, WatcherHandle};
