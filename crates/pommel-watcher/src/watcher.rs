use crate::debounce::{DebounceConfig, DebounceState};
use crate::error::Result;
use crate::event::{is_relevant_path, FileEvent};
use crate::queue::EventBatchQueue;
use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher as NotifyWatcher};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

#[derive(Debug, Clone)]
pub struct WatcherConfig {
    pub debounce: DebounceConfig,
    pub queue_capacity: usize,
    pub drop_oldest: bool,
    /// How often the debounce loop re-checks its deadline even with no
    /// new events, bounding how late a `max_batch_wait` flush can fire.
    pub poll_interval: Duration,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            debounce: DebounceConfig::default(),
            queue_capacity: 64,
            drop_oldest: false,
            poll_interval: Duration::from_millis(200),
        }
    }
}

enum Command {
    Trigger { reason: String },
    Shutdown,
}

/// Handle used to ask a running [`FsWatcher`] to flush immediately or
/// stop.
#[derive(Clone)]
pub struct WatcherHandle {
    command_tx: mpsc::Sender<Command>,
}

impl WatcherHandle {
    pub async fn trigger(&self, reason: impl Into<String>) {
        let _ = self.command_tx.send(Command::Trigger { reason: reason.into() }).await;
    }

    pub async fn shutdown(&self) {
        let _ = self.command_tx.send(Command::Shutdown).await;
    }
}

/// Recursive filesystem watcher over a project root. Raw `notify` events
/// are filtered, debounced, and coalesced into batches on
/// [`EventBatchQueue`] for the indexer to drain (§4.5).
pub struct FsWatcher {
    _notify_watcher: RecommendedWatcher,
}

impl FsWatcher {
    pub fn spawn(
        root: impl AsRef<Path>,
        config: WatcherConfig,
    ) -> Result<(Self, WatcherHandle, Arc<EventBatchQueue>)> {
        let (raw_tx, mut raw_rx) = mpsc::channel::<Event>(256);
        let (command_tx, mut command_rx) = mpsc::channel::<Command>(16);
        let queue = Arc::new(EventBatchQueue::new(config.queue_capacity, config.drop_oldest));

        let mut notify_watcher = RecommendedWatcher::new(
            move |res: notify::Result<Event>| {
                if let Ok(event) = res {
                    let _ = raw_tx.blocking_send(event);
                }
            },
            notify::Config::default().with_poll_interval(Duration::from_secs(2)),
        )?;
        notify_watcher.watch(root.as_ref(), RecursiveMode::Recursive)?;

        let queue_for_loop = Arc::clone(&queue);
        let poll_interval = config.poll_interval;
        tokio::spawn(async move {
            let mut debounce = DebounceState::new(config.debounce);
            loop {
                let deadline = debounce.next_deadline();
                tokio::select! {
                    biased;

                    cmd = command_rx.recv() => {
                        match cmd {
                            Some(Command::Trigger { reason }) => debounce.force_run(reason),
                            Some(Command::Shutdown) | None => break,
                        }
                    }
                    maybe_event = raw_rx.recv() => {
                        let Some(event) = maybe_event else { break };
                        for path in event.paths {
                            if !is_relevant_path(&path) {
                                continue;
                            }
                            if let Some(file_event) = classify(&event.kind, path) {
                                debounce.record_event(file_event);
                            }
                        }
                    }
                    () = sleep_until_deadline(deadline, poll_interval) => {}
                }

                if debounce.should_run() {
                    let (events, _reason) = debounce.take_batch();
                    if !events.is_empty() {
                        queue_for_loop.push(events);
                    }
                }
            }
        });

        Ok((
            Self {
                _notify_watcher: notify_watcher,
            },
            WatcherHandle { command_tx },
            queue,
        ))
    }
}

async fn sleep_until_deadline(deadline: Option<std::time::Instant>, poll_interval: Duration) {
    match deadline {
        Some(when) => tokio::time::sleep_until(when.into()).await,
        None => tokio::time::sleep(poll_interval).await,
    }
}

fn classify(kind: &EventKind, path: std::path::PathBuf) -> Option<FileEvent> {
    match kind {
        EventKind::Create(_) => Some(FileEvent::Created(path)),
        EventKind::Modify(_) => Some(FileEvent::Modified(path)),
        EventKind::Remove(_) => Some(FileEvent::Deleted(path)),
        _ => None,
    }
}
