use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use pommel_protocol::HealthResponse;

pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        uptime_secs: state.started_at.elapsed().as_secs(),
        version: state.version.to_string(),
    })
}
