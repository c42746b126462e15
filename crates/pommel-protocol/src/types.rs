use serde::{Deserialize, Serialize};

fn default_search_limit() -> usize {
    10
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchRequest {
    pub query: String,
    #[serde(default = "default_search_limit")]
    pub limit: usize,
    #[serde(default)]
    pub levels: Option<Vec<String>>,
    #[serde(default)]
    pub path_prefix: Option<String>,
    #[serde(default)]
    pub subproject_ids: Option<Vec<String>>,
}

/// The enclosing chunk one level up the containment hierarchy, e.g. the
/// class a matched method belongs to (§6: `SearchResult.parent`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParentRef {
    pub id: String,
    pub name: Option<String>,
    pub level: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub file_path: String,
    pub start_line: usize,
    pub end_line: usize,
    pub level: String,
    pub name: Option<String>,
    pub content: String,
    pub score: f32,
    pub subproject_id: Option<String>,
    pub parent: Option<ParentRef>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResponse {
    pub results: Vec<SearchHit>,
    pub query: String,
    pub took_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ReindexRequest {
    #[serde(default)]
    pub path: Option<String>,
    #[serde(default)]
    pub full: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReindexResponse {
    pub status: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub uptime_secs: u64,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub state: String,
    pub files_indexed: i64,
    pub chunks_indexed: i64,
    pub embeddings_indexed: i64,
    pub pending_events: usize,
    pub model_id: String,
    pub dimension: usize,
    pub last_index_duration_ms: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubprojectInfo {
    pub id: String,
    pub path: String,
    pub name: String,
    pub marker_kind: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubprojectsResponse {
    pub subprojects: Vec<SubprojectInfo>,
}

/// Config surfaced at `/config`, with secrets redacted (§2 Configuration:
/// "never echo a secret back over the API, even to localhost").
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigResponse {
    pub embedding_provider: String,
    pub embedding_model: String,
    pub embedding_base_url: String,
    pub has_api_key: bool,
    pub dense_weight: f32,
    pub lexical_weight: f32,
    pub rrf_k: f32,
    pub reranker: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn search_request_defaults_limit_when_omitted() {
        let parsed: SearchRequest = serde_json::from_str(r#"{"query":"widget"}"#).unwrap();
        assert_eq!(parsed.limit, 10);
        assert!(parsed.path_prefix.is_none());
    }

    #[test]
    fn reindex_request_defaults_to_incremental() {
        let parsed: ReindexRequest = serde_json::from_str("{}").unwrap();
        assert!(!parsed.full);
        assert!(parsed.path.is_none());
    }
}
