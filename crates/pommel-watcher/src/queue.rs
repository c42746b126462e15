use crate::event::FileEvent;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use tokio::sync::Notify;

/// Bounded queue of coalesced [`FileEvent`] batches between the watcher
/// and the indexer. When full, either blocks the oldest-batch-drop policy
/// (§4.5: "bounded channel with backpressure/drop-oldest option") —
/// configured per deployment, since a CI sandbox with enormous churn
/// wants drop-oldest while an interactive dev box wants to never lose an
/// event.
pub struct EventBatchQueue {
    inner: Mutex<VecDeque<Vec<FileEvent>>>,
    notify: Notify,
    capacity: usize,
    drop_oldest: bool,
    dropped_batches: AtomicU64,
}

impl EventBatchQueue {
    #[must_use]
    pub fn new(capacity: usize, drop_oldest: bool) -> Self {
        Self {
            inner: Mutex::new(VecDeque::with_capacity(capacity.max(1))),
            notify: Notify::new(),
            capacity: capacity.max(1),
            drop_oldest,
            dropped_batches: AtomicU64::new(0),
        }
    }

    /// Enqueue a batch. Returns `false` if the queue was full and the
    /// batch was rejected (only possible when `drop_oldest` is false).
    pub fn push(&self, batch: Vec<FileEvent>) -> bool {
        if batch.is_empty() {
            return true;
        }
        let accepted = {
            let mut queue = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
            if queue.len() >= self.capacity {
                if self.drop_oldest {
                    queue.pop_front();
                    self.dropped_batches.fetch_add(1, Ordering::Relaxed);
                } else {
                    self.dropped_batches.fetch_add(1, Ordering::Relaxed);
                    return false;
                }
            }
            queue.push_back(batch);
            true
        };
        self.notify.notify_one();
        accepted
    }

    /// Wait for and return the next batch.
    pub async fn next_batch(&self) -> Vec<FileEvent> {
        loop {
            if let Some(batch) = self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).pop_front() {
                return batch;
            }
            self.notify.notified().await;
        }
    }

    #[must_use]
    pub fn dropped_batches(&self) -> u64 {
        self.dropped_batches.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inner.lock().unwrap_or_else(std::sync::PoisonError::into_inner).len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn batch(name: &str) -> Vec<FileEvent> {
        vec![FileEvent::Modified(PathBuf::from(name))]
    }

    #[test]
    fn rejects_when_full_and_not_drop_oldest() {
        let queue = EventBatchQueue::new(1, false);
        assert!(queue.push(batch("a.rs")));
        assert!(!queue.push(batch("b.rs")));
        assert_eq!(queue.dropped_batches(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[test]
    fn drop_oldest_keeps_the_newest_batch() {
        let queue = EventBatchQueue::new(1, true);
        assert!(queue.push(batch("a.rs")));
        assert!(queue.push(batch("b.rs")));
        assert_eq!(queue.dropped_batches(), 1);
        assert_eq!(queue.len(), 1);
    }

    #[tokio::test]
    async fn next_batch_waits_for_a_push() {
        let queue = EventBatchQueue::new(4, false);
        queue.push(batch("a.rs"));
        let batch = queue.next_batch().await;
        assert_eq!(batch.len(), 1);
        assert!(queue.is_empty());
    }
}
