use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use pommel_protocol::{ReindexRequest, ReindexResponse};

pub async fn reindex(
    State(state): State<AppState>,
    Json(request): Json<ReindexRequest>,
) -> Result<Json<ReindexResponse>, AppError> {
    let stats = match request.path {
        Some(path) => state.indexer.index_path(&path).await?,
        None => state.indexer.index_all(request.full).await?,
    };

    Ok(Json(ReindexResponse {
        status: "ok".to_string(),
        message: format!(
            "scanned {} files, reindexed {}, removed {}, {} chunks, {} errors",
            stats.files_scanned,
            stats.files_changed,
            stats.files_removed,
            stats.chunks_indexed,
            stats.errors.len()
        ),
    }))
}
