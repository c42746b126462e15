use crate::error::Result;
use async_trait::async_trait;
use pommel_chunker::Chunk;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;
use std::time::Duration;
use unicode_segmentation::UnicodeSegmentation;

/// Extracts the first `"..."` quoted span from a query, if any.
fn quoted_phrase(query: &str) -> Option<&str> {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    let re = PATTERN.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("static regex is valid"));
    re.captures(query).and_then(|c| c.get(1)).map(|m| m.as_str())
}

/// A chunk carrying its fused retrieval score, the unit [`Reranker`]
/// consumes and reorders (§4.4).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RankedChunk {
    pub chunk_id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub level: String,
    pub name: Option<String>,
    pub content: String,
    pub score: f32,
    pub subproject_id: Option<String>,
    pub parent_id: Option<String>,
    pub last_modified: u64,
}

impl RankedChunk {
    #[must_use]
    pub fn from_chunk(chunk: &Chunk, score: f32) -> Self {
        Self {
            chunk_id: chunk.id.clone(),
            file_path: chunk.file_path.clone(),
            start_line: chunk.start_line,
            end_line: chunk.end_line,
            level: chunk.level.as_str().to_string(),
            name: chunk.name.clone(),
            content: chunk.content.clone(),
            score,
            subproject_id: chunk.subproject_id.clone(),
            parent_id: chunk.parent_id.clone(),
            last_modified: chunk.last_modified,
        }
    }
}

/// Re-scores and reorders fused retrieval candidates against the query
/// text (§4.4). `name()` identifies the strategy for logging/diagnostics.
#[async_trait]
pub trait Reranker: Send + Sync {
    async fn rerank(&self, query: &str, candidates: Vec<RankedChunk>) -> Result<Vec<RankedChunk>>;
    fn name(&self) -> String;
}

/// Six bounded signal functions, each in `[-0.2, 0.2]`, combined with the
/// fused retrieval score as `final = 0.7*base + 0.3*base*(1 + sum(signals))`
/// (§4.4). Cheap, deterministic, and needs no network — the default
/// reranker and the fallback target for [`FallbackReranker`].
#[derive(Debug, Clone, Default)]
pub struct HeuristicReranker;

/// Prefixes/suffixes morphologically typical of a verb (an action query
/// like "parse the config" or "validating input") vs. a noun (an entity
/// query like "the Widget struct").
const VERB_AFFIXES: &[&str] = &["ing", "ize", "ise", "fy"];
const VERB_PREFIXES: &[&str] = &["how to", "get", "set", "parse", "build", "create", "validate", "handle", "run", "process"];
const NOUN_SUFFIXES: &[&str] = &["tion", "ment", "ness", "er", "or"];

impl HeuristicReranker {
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// +0.1 per distinct query term found as a substring of the chunk's
    /// `name`, capped at +0.2 (§4.8).
    fn name_match(query_tokens: &[String], chunk: &RankedChunk) -> f32 {
        let Some(name) = &chunk.name else { return 0.0 };
        let name_lower = name.to_lowercase();
        let distinct_hits = query_tokens.iter().filter(|t| name_lower.contains(t.as_str())).count();
        (0.1 * distinct_hits as f32).min(0.2)
    }

    /// A `"quoted phrase"` in the query is an explicit ask for a literal
    /// match; when present, only the quoted text (not the whole query)
    /// needs to appear verbatim in the chunk to earn the signal.
    fn exact_phrase(query: &str, chunk: &RankedChunk) -> f32 {
        let needle = quoted_phrase(query).unwrap_or(query);
        if !needle.trim().is_empty() && chunk.content.to_lowercase().contains(&needle.to_lowercase()) {
            0.15
        } else {
            0.0
        }
    }

    /// +0.075 per query term found in `file_path`, capped at +0.15 (§4.8).
    fn path_match(query_tokens: &[String], chunk: &RankedChunk) -> f32 {
        let path_lower = chunk.file_path.to_lowercase();
        let distinct_hits = query_tokens.iter().filter(|t| path_lower.contains(t.as_str())).count();
        (0.075 * distinct_hits as f32).min(0.15)
    }

    fn test_penalty(chunk: &RankedChunk) -> f32 {
        let path_lower = chunk.file_path.to_lowercase();
        let is_test = path_lower.ends_with("_test.go")
            || path_lower.ends_with(".spec.ts")
            || path_lower.contains("/test/")
            || path_lower.contains("/tests/")
            || path_lower.starts_with("test/")
            || path_lower.starts_with("tests/")
            || path_lower.ends_with("_test.rs");
        if is_test {
            return -0.15;
        }
        let is_mock = path_lower.contains("mock_") || path_lower.contains("_mock.");
        if is_mock {
            -0.1
        } else {
            0.0
        }
    }

    /// +0.10 within 1 day, +0.05 within 7 days, +0.02 within 30 days,
    /// else 0; a future `last_modified` (clock skew, bad metadata) also
    /// yields 0 rather than a boost (§4.8).
    fn recency_boost(chunk: &RankedChunk) -> f32 {
        const DAY: u64 = 86_400;
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0);
        if chunk.last_modified > now {
            return 0.0;
        }
        let age = now - chunk.last_modified;
        if age <= DAY {
            0.10
        } else if age <= 7 * DAY {
            0.05
        } else if age <= 30 * DAY {
            0.02
        } else {
            0.0
        }
    }

    /// +0.05 when the query reads as an action ("parse the config") and
    /// the chunk is a method/function; +0.05 when the query reads as an
    /// entity reference ("the Widget struct") and the chunk is a
    /// class/struct/type (§4.8).
    fn chunk_type_affinity(query: &str, chunk: &RankedChunk) -> f32 {
        let query_lower = query.to_lowercase();
        let lower_words: Vec<&str> = query_lower.split_whitespace().collect();
        let original_words: Vec<&str> = query.split_whitespace().collect();

        let verb_like = VERB_PREFIXES.iter().any(|p| query_lower.starts_with(p))
            || lower_words.iter().any(|w| VERB_AFFIXES.iter().any(|suffix| w.ends_with(suffix)));
        let noun_like = original_words
            .iter()
            .any(|w| w.chars().next().map(char::is_uppercase).unwrap_or(false))
            || lower_words.iter().any(|w| NOUN_SUFFIXES.iter().any(|suffix| w.ends_with(suffix)));

        let mut signal = 0.0;
        if verb_like && matches!(chunk.level.as_str(), "method" | "section") {
            signal += 0.05;
        }
        if noun_like && matches!(chunk.level.as_str(), "class" | "file") {
            signal += 0.05;
        }
        signal
    }
}

#[async_trait]
impl Reranker for HeuristicReranker {
    async fn rerank(&self, query: &str, mut candidates: Vec<RankedChunk>) -> Result<Vec<RankedChunk>> {
        let query_tokens: Vec<String> = query.unicode_words().map(str::to_lowercase).collect();

        for chunk in &mut candidates {
            let base = chunk.score;
            let signal_sum = Self::name_match(&query_tokens, chunk)
                + Self::exact_phrase(query, chunk)
                + Self::path_match(&query_tokens, chunk)
                + Self::test_penalty(chunk)
                + Self::recency_boost(chunk)
                + Self::chunk_type_affinity(query, chunk);
            chunk.score = 0.7 * base + 0.3 * base * (1.0 + signal_sum);
        }

        candidates.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        Ok(candidates)
    }

    fn name(&self) -> String {
        "heuristic".to_string()
    }
}

#[derive(Debug, Deserialize)]
struct RemoteScore {
    chunk_id: String,
    score: f32,
}

#[derive(Debug, Serialize)]
struct RemoteRerankRequest<'a> {
    query: &'a str,
    candidates: Vec<RemoteCandidate<'a>>,
}

#[derive(Debug, Serialize)]
struct RemoteCandidate<'a> {
    chunk_id: &'a str,
    content: &'a str,
}

/// Calls an external cross-encoder reranking service, timeout-bounded
/// (§4.4). Callers should wrap this in [`FallbackReranker`] so a slow or
/// unreachable remote never blocks a search request indefinitely.
pub struct RemoteReranker {
    client: reqwest::Client,
    endpoint: String,
    timeout: Duration,
}

impl RemoteReranker {
    #[must_use]
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Reranker for RemoteReranker {
    async fn rerank(&self, query: &str, candidates: Vec<RankedChunk>) -> Result<Vec<RankedChunk>> {
        let request = RemoteRerankRequest {
            query,
            candidates: candidates
                .iter()
                .map(|c| RemoteCandidate {
                    chunk_id: &c.chunk_id,
                    content: &c.content,
                })
                .collect(),
        };

        let response = tokio::time::timeout(
            self.timeout,
            self.client.post(&self.endpoint).json(&request).send(),
        )
        .await
        .map_err(|_| crate::error::SearchError::Reranker("remote reranker timed out".to_string()))?
        .map_err(|e| crate::error::SearchError::Reranker(e.to_string()))?;

        let scores: Vec<RemoteScore> = response
            .json()
            .await
            .map_err(|e| crate::error::SearchError::Reranker(e.to_string()))?;

        let mut by_id: std::collections::HashMap<String, f32> =
            scores.into_iter().map(|s| (s.chunk_id, s.score)).collect();

        let mut reranked: Vec<RankedChunk> = candidates
            .into_iter()
            .map(|mut c| {
                if let Some(score) = by_id.remove(&c.chunk_id) {
                    c.score = score;
                }
                c
            })
            .collect();
        reranked.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk_id.cmp(&b.chunk_id))
        });
        Ok(reranked)
    }

    fn name(&self) -> String {
        "remote".to_string()
    }
}

/// Runs `primary`, falling back to `secondary` if `primary` errors
/// (§4.4). Named `"<primary>-><secondary>"` so logs and `/status` show
/// which path actually served a given request.
pub struct FallbackReranker {
    primary: Box<dyn Reranker>,
    secondary: Box<dyn Reranker>,
}

impl FallbackReranker {
    #[must_use]
    pub fn new(primary: Box<dyn Reranker>, secondary: Box<dyn Reranker>) -> Self {
        Self { primary, secondary }
    }
}

#[async_trait]
impl Reranker for FallbackReranker {
    async fn rerank(&self, query: &str, candidates: Vec<RankedChunk>) -> Result<Vec<RankedChunk>> {
        match self.primary.rerank(query, candidates.clone()).await {
            Ok(result) => Ok(result),
            Err(err) => {
                log::warn!("primary reranker '{}' failed ({err}), falling back to '{}'", self.primary.name(), self.secondary.name());
                self.secondary.rerank(query, candidates).await
            }
        }
    }

    fn name(&self) -> String {
        format!("{}->{}", self.primary.name(), self.secondary.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_phrase_extracts_the_literal_span() {
        assert_eq!(quoted_phrase(r#"find "parse config" usages"#), Some("parse config"));
        assert_eq!(quoted_phrase("no quotes here"), None);
    }

    fn chunk(id: &str, name: &str, path: &str, content: &str, score: f32) -> RankedChunk {
        RankedChunk {
            chunk_id: id.to_string(),
            file_path: path.to_string(),
            start_line: 1,
            end_line: 5,
            level: "method".to_string(),
            name: Some(name.to_string()),
            content: content.to_string(),
            score,
            subproject_id: None,
            parent_id: None,
            last_modified: 0,
        }
    }

    #[tokio::test]
    async fn name_match_boosts_exact_symbol_hits() {
        let reranker = HeuristicReranker::new();
        let candidates = vec![
            chunk("a", "parse_config", "src/config.rs", "fn parse_config() {}", 0.5),
            chunk("b", "unrelated", "src/other.rs", "fn unrelated() {}", 0.5),
        ];
        let reranked = reranker.rerank("parse_config", candidates).await.unwrap();
        assert_eq!(reranked[0].chunk_id, "a");
    }

    #[tokio::test]
    async fn test_files_are_penalized() {
        let reranker = HeuristicReranker::new();
        let candidates = vec![
            chunk("prod", "widget", "src/widget.rs", "struct Widget;", 0.5),
            chunk("test", "widget", "tests/widget_test.rs", "struct Widget;", 0.5),
        ];
        let reranked = reranker.rerank("widget", candidates).await.unwrap();
        assert_eq!(reranked[0].chunk_id, "prod");
    }

    #[tokio::test]
    async fn mock_files_are_penalized_less_than_test_files() {
        let reranker = HeuristicReranker::new();
        let candidates = vec![
            chunk("mock", "widget", "src/mock_widget.rs", "struct Widget;", 0.5),
            chunk("test", "widget", "tests/widget_test.rs", "struct Widget;", 0.5),
        ];
        let reranked = reranker.rerank("widget", candidates).await.unwrap();
        assert_eq!(reranked[0].chunk_id, "mock");
    }

    #[tokio::test]
    async fn a_file_named_latest_is_not_mistaken_for_a_test_file() {
        assert_eq!(HeuristicReranker::test_penalty(&chunk("a", "x", "src/latest.rs", "", 0.5)), 0.0);
    }

    #[tokio::test]
    async fn recently_modified_chunks_outrank_stale_ones_at_equal_base_score() {
        let reranker = HeuristicReranker::new();
        let now = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap()
            .as_secs();
        let mut stale = chunk("stale", "widget", "src/widget.rs", "struct Widget;", 0.5);
        stale.last_modified = 0;
        let mut fresh = chunk("fresh", "widget", "src/widget.rs", "struct Widget;", 0.5);
        fresh.last_modified = now;

        let reranked = reranker.rerank("widget", vec![stale, fresh]).await.unwrap();
        assert_eq!(reranked[0].chunk_id, "fresh");
    }

    struct AlwaysFails;
    #[async_trait]
    impl Reranker for AlwaysFails {
        async fn rerank(&self, _query: &str, _candidates: Vec<RankedChunk>) -> Result<Vec<RankedChunk>> {
            Err(crate::error::SearchError::Reranker("boom".to_string()))
        }
        fn name(&self) -> String {
            "always-fails".to_string()
        }
    }

    #[tokio::test]
    async fn fallback_reranker_uses_secondary_on_primary_error() {
        let fallback = FallbackReranker::new(Box::new(AlwaysFails), Box::new(HeuristicReranker::new()));
        assert_eq!(fallback.name(), "always-fails->heuristic");
        let candidates = vec![chunk("a", "foo", "src/a.rs", "fn foo() {}", 0.5)];
        let result = fallback.rerank("foo", candidates).await.unwrap();
        assert_eq!(result.len(), 1);
    }
}
