use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use pommel_protocol::StatusResponse;

pub async fn status(State(state): State<AppState>) -> Result<Json<StatusResponse>, AppError> {
    let stats = state.store.stats()?;
    let indexer_state = state.indexer.state().await;

    Ok(Json(StatusResponse {
        state: indexer_state.to_string(),
        files_indexed: stats.file_count,
        chunks_indexed: stats.chunk_count,
        embeddings_indexed: stats.embedding_count,
        pending_events: state.event_queue.as_ref().map(|q| q.len()).unwrap_or(0),
        model_id: state.config.embedding.model.clone(),
        dimension: state.config.embedding.dimension,
        last_index_duration_ms: None,
    }))
}
