//! Fuzzy string scoring for the reranker's name/path signals, so
//! `"HndlReq"` still boosts `handle_request` instead of requiring an
//! exact substring (§4.4).

use nucleo_matcher::pattern::{CaseMatching, Normalization, Pattern};
use nucleo_matcher::{Config, Matcher};
use std::sync::Mutex;

/// `nucleo_matcher::Matcher` is `!Sync` internally (it reuses scratch
/// buffers), so the reranker's signal functions share one behind a
/// mutex rather than constructing a fresh matcher per call.
pub struct FuzzyScorer {
    matcher: Mutex<Matcher>,
}

impl Default for FuzzyScorer {
    fn default() -> Self {
        Self::new()
    }
}

impl FuzzyScorer {
    /// Nucleo scores are unbounded but a clean exact match on a short
    /// identifier lands well under this; used purely to rescale into
    /// the reranker's `[0, 1]` signal range.
    const MAX_EXPECTED_SCORE: f32 = 200.0;

    #[must_use]
    pub fn new() -> Self {
        Self {
            matcher: Mutex::new(Matcher::new(Config::DEFAULT)),
        }
    }

    /// Fuzzy-match `needle` against `haystack`, normalized to `[0, 1]`.
    /// Returns `0.0` for no match or an empty needle, never panics.
    #[must_use]
    pub fn score(&self, needle: &str, haystack: &str) -> f32 {
        if needle.trim().is_empty() || haystack.is_empty() {
            return 0.0;
        }
        let pattern = Pattern::parse(needle, CaseMatching::Ignore, Normalization::Smart);
        let mut matcher = self.matcher.lock().unwrap_or_else(|e| e.into_inner());
        let mut buf = Vec::new();
        let haystack = nucleo_matcher::Utf32Str::new(haystack, &mut buf);
        let score = pattern.score(haystack, &mut matcher);
        match score {
            Some(raw) => (raw as f32 / Self::MAX_EXPECTED_SCORE).min(1.0),
            None => 0.0,
        }
    }
}
