use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use pommel_protocol::ConfigResponse;

/// Redacts secrets before echoing config back (§2 Configuration: "never
/// echo a secret back over the API, even to localhost").
pub async fn config(State(state): State<AppState>) -> Json<ConfigResponse> {
    let cfg = &state.config;
    Json(ConfigResponse {
        embedding_provider: cfg.embedding.provider.clone(),
        embedding_model: cfg.embedding.model.clone(),
        embedding_base_url: cfg.embedding.base_url.clone(),
        has_api_key: cfg.embedding.api_key.is_some(),
        dense_weight: cfg.search.dense_weight,
        lexical_weight: cfg.search.lexical_weight,
        rrf_k: cfg.search.rrf_k,
        reranker: cfg.search.reranker.clone(),
    })
}
