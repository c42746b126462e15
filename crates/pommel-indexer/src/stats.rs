use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Result of one indexing cycle (full or incremental).
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct IndexStats {
    pub files_scanned: usize,
    pub files_changed: usize,
    pub files_removed: usize,
    pub chunks_indexed: usize,
    pub embeddings_computed: usize,
    pub duration_ms: u64,
    pub errors: Vec<String>,
}

/// Exponential-moving-average smoother for throughput/ETA reporting
/// (§4.5 "progress/ETA (EMA-smoothed)"). A fresh tracker has no estimate
/// until the first sample arrives.
#[derive(Debug, Clone)]
pub struct ThroughputTracker {
    alpha: f32,
    files_per_sec: Option<f32>,
    last_sample: Option<Instant>,
}

impl ThroughputTracker {
    #[must_use]
    pub fn new(alpha: f32) -> Self {
        Self {
            alpha: alpha.clamp(0.0, 1.0),
            files_per_sec: None,
            last_sample: None,
        }
    }

    /// Record that `files_done` files completed since the last sample.
    pub fn sample(&mut self, files_done: usize) {
        let now = Instant::now();
        if let Some(last) = self.last_sample {
            let elapsed = now.duration_since(last).as_secs_f32().max(0.001);
            let instantaneous = files_done as f32 / elapsed;
            self.files_per_sec = Some(match self.files_per_sec {
                Some(prev) => self.alpha * instantaneous + (1.0 - self.alpha) * prev,
                None => instantaneous,
            });
        }
        self.last_sample = Some(now);
    }

    #[must_use]
    pub fn files_per_sec(&self) -> Option<f32> {
        self.files_per_sec
    }

    #[must_use]
    pub fn eta(&self, files_remaining: usize) -> Option<Duration> {
        let rate = self.files_per_sec?;
        if rate <= 0.0 {
            return None;
        }
        Some(Duration::from_secs_f32(files_remaining as f32 / rate))
    }
}
