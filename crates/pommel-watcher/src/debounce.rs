use crate::event::FileEvent;
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::{Duration, Instant};

#[derive(Debug, Clone)]
pub struct DebounceConfig {
    /// Run once this long has elapsed since the last event in the batch.
    pub debounce: Duration,
    /// Run unconditionally once this long has elapsed since the first
    /// event in the batch, so a steady trickle of changes can't starve
    /// indexing forever.
    pub max_batch_wait: Duration,
}

impl Default for DebounceConfig {
    fn default() -> Self {
        Self {
            debounce: Duration::from_millis(750),
            max_batch_wait: Duration::from_secs(3),
        }
    }
}

/// Accumulates filesystem events into one pending batch and decides when
/// it's time to flush (§4.5). Ported from the batching strategy a
/// streaming indexer needs: coalesce by path (last event wins), run on
/// quiet-period-or-timeout, and allow an explicit trigger to force an
/// immediate run regardless of either deadline.
#[derive(Debug)]
pub struct DebounceState {
    config: DebounceConfig,
    pending: HashMap<PathBuf, FileEvent>,
    first_event: Option<Instant>,
    last_event: Option<Instant>,
    force_immediate: bool,
    reason: Option<String>,
}

impl DebounceState {
    #[must_use]
    pub fn new(config: DebounceConfig) -> Self {
        Self {
            config,
            pending: HashMap::new(),
            first_event: None,
            last_event: None,
            force_immediate: false,
            reason: None,
        }
    }

    pub fn record_event(&mut self, event: FileEvent) {
        let now = Instant::now();
        if self.first_event.is_none() {
            self.first_event = Some(now);
        }
        self.last_event = Some(now);
        self.pending.insert(event.path().to_path_buf(), event);
    }

    /// Request an immediate flush regardless of timing, e.g. a manual
    /// `reindex` API call or a watch command.
    pub fn force_run(&mut self, reason: impl Into<String>) {
        self.force_immediate = true;
        self.reason = Some(reason.into());
        if self.first_event.is_none() {
            self.first_event = Some(Instant::now());
            self.last_event = self.first_event;
        }
    }

    #[must_use]
    pub fn should_run(&self) -> bool {
        if self.pending.is_empty() && !self.force_immediate {
            return false;
        }
        if self.force_immediate {
            return true;
        }
        let Some(last) = self.last_event else { return false };
        let Some(first) = self.first_event else { return false };
        last.elapsed() >= self.config.debounce || first.elapsed() >= self.config.max_batch_wait
    }

    /// The instant the batch becomes eligible to run, for a caller to
    /// `sleep_until` in a select loop. `None` means nothing pending.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Instant> {
        if self.force_immediate {
            return Some(Instant::now());
        }
        let last = self.last_event?;
        let first = self.first_event?;
        Some((last + self.config.debounce).min(first + self.config.max_batch_wait))
    }

    /// Drain the pending batch, returning its events and the reason (if
    /// any explicit trigger supplied one).
    pub fn take_batch(&mut self) -> (Vec<FileEvent>, Option<String>) {
        let events = self.pending.drain().map(|(_, v)| v).collect();
        let reason = self.reason.take();
        self.reset();
        (events, reason)
    }

    fn reset(&mut self) {
        self.first_event = None;
        self.last_event = None;
        self.force_immediate = false;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recorded_event_generates_a_deadline() {
        let mut state = DebounceState::new(DebounceConfig::default());
        assert!(state.next_deadline().is_none());
        state.record_event(FileEvent::Modified(PathBuf::from("a.rs")));
        assert!(state.next_deadline().is_some());
        assert!(!state.should_run(), "debounce window has not elapsed yet");
    }

    #[test]
    fn force_run_sets_immediate_deadline() {
        let mut state = DebounceState::new(DebounceConfig::default());
        state.force_run("manual reindex");
        assert!(state.should_run());
        let (events, reason) = state.take_batch();
        assert!(events.is_empty());
        assert_eq!(reason.as_deref(), Some("manual reindex"));
    }

    #[test]
    fn coalesces_repeated_events_for_the_same_path() {
        let mut state = DebounceState::new(DebounceConfig::default());
        state.record_event(FileEvent::Created(PathBuf::from("a.rs")));
        state.record_event(FileEvent::Modified(PathBuf::from("a.rs")));
        state.force_run("test");
        let (events, _) = state.take_batch();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0], FileEvent::Modified(PathBuf::from("a.rs")));
    }
}
