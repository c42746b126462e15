//! End-to-end exercise of the HTTP surface (§6/§7) against a real
//! project tree, using a mock embedder so no network calls happen.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use pommel_daemon::config::{EmbeddingConfig, PommelConfig};
use pommel_daemon::{build_state, routes};
use pommel_protocol::{
    ApiError, ConfigResponse, HealthResponse, ReindexRequest, ReindexResponse, SearchRequest, SearchResponse,
    StatusResponse, SubprojectsResponse,
};
use serde_json::json;
use tempfile::TempDir;
use tower::ServiceExt;

fn mock_config() -> PommelConfig {
    PommelConfig {
        embedding: EmbeddingConfig {
            provider: "mock".to_string(),
            dimension: 32,
            ..EmbeddingConfig::default()
        },
        ..PommelConfig::default()
    }
}

fn sample_project() -> TempDir {
    let dir = TempDir::new().unwrap();
    std::fs::write(
        dir.path().join("lib.rs"),
        "struct Widget {\n    name: String,\n}\n\nimpl Widget {\n    fn render(&self) -> String {\n        self.name.clone()\n    }\n}\n",
    )
    .unwrap();
    std::fs::write(dir.path().join("Cargo.toml"), "[package]\nname = \"sample\"\n").unwrap();
    dir
}

async fn body_json<T: serde::de::DeserializeOwned>(response: axum::response::Response) -> T {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_reports_ok_and_version() {
    let project = sample_project();
    let (state, _watcher) = build_state(project.path(), mock_config()).unwrap();
    let app = routes::router(state);

    let response = app
        .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let health: HealthResponse = body_json(response).await;
    assert_eq!(health.status, "ok");
    assert!(!health.version.is_empty());
}

#[tokio::test]
async fn status_reflects_an_empty_freshly_opened_store() {
    let project = sample_project();
    let (state, _watcher) = build_state(project.path(), mock_config()).unwrap();
    let app = routes::router(state);

    let response = app
        .oneshot(Request::builder().uri("/status").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let status: StatusResponse = body_json(response).await;
    assert_eq!(status.files_indexed, 0);
    assert_eq!(status.chunks_indexed, 0);
    assert_eq!(status.dimension, 32);
}

#[tokio::test]
async fn reindex_then_search_finds_the_indexed_chunk() {
    let project = sample_project();
    let (state, _watcher) = build_state(project.path(), mock_config()).unwrap();
    let app = routes::router(state);

    let reindex_req = ReindexRequest { path: None, full: true };
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reindex")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&reindex_req).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let reindex: ReindexResponse = body_json(response).await;
    assert_eq!(reindex.status, "ok");

    let search_req = SearchRequest {
        query: "Widget render".to_string(),
        limit: 10,
        levels: None,
        path_prefix: None,
        subproject_ids: None,
    };
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&search_req).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let search: SearchResponse = body_json(response).await;
    assert!(!search.results.is_empty());
    assert!(search.results.iter().any(|hit| hit.file_path.ends_with("lib.rs")));
}

#[tokio::test]
async fn search_rejects_empty_query_with_400() {
    let project = sample_project();
    let (state, _watcher) = build_state(project.path(), mock_config()).unwrap();
    let app = routes::router(state);

    let search_req = json!({ "query": "   ", "limit": 10 });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&search_req).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let err: ApiError = body_json(response).await;
    assert!(matches!(err, ApiError::InvalidRequest { .. }));
}

#[tokio::test]
async fn search_rejects_out_of_range_limit() {
    let project = sample_project();
    let (state, _watcher) = build_state(project.path(), mock_config()).unwrap();
    let app = routes::router(state);

    let search_req = json!({ "query": "widget", "limit": 501 });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&search_req).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn search_coerces_a_zero_limit_to_the_configured_default() {
    let project = sample_project();
    let (state, _watcher) = build_state(project.path(), mock_config()).unwrap();
    let app = routes::router(state);

    let reindex_req = ReindexRequest { path: None, full: true };
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reindex")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&reindex_req).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let search_req = json!({ "query": "widget", "limit": 0 });
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/search")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&search_req).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let search: SearchResponse = body_json(response).await;
    assert!(!search.results.is_empty());
}

#[tokio::test]
async fn subprojects_includes_the_root_as_a_fallback() {
    let project = sample_project();
    let (state, _watcher) = build_state(project.path(), mock_config()).unwrap();
    let app = routes::router(state);

    let reindex_req = ReindexRequest { path: None, full: true };
    let response = app
        .clone()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/reindex")
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&reindex_req).unwrap()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let response = app
        .oneshot(Request::builder().uri("/subprojects").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let subprojects: SubprojectsResponse = body_json(response).await;
    assert!(!subprojects.subprojects.is_empty());
}

#[tokio::test]
async fn config_redacts_api_keys() {
    let project = sample_project();
    let mut config = mock_config();
    config.embedding.api_key = Some("super-secret".to_string());
    let (state, _watcher) = build_state(project.path(), config).unwrap();
    let app = routes::router(state);

    let response = app
        .oneshot(Request::builder().uri("/config").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let raw = String::from_utf8(body.to_vec()).unwrap();
    assert!(!raw.contains("super-secret"));

    let config: ConfigResponse = serde_json::from_str(&raw).unwrap();
    assert!(config.has_api_key);
}
