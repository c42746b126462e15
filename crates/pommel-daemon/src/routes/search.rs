use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use pommel_protocol::{ApiError, ParentRef, SearchHit, SearchRequest, SearchResponse};
use pommel_search::SearchFilters;
use std::time::Instant;

pub async fn search(
    State(state): State<AppState>,
    Json(request): Json<SearchRequest>,
) -> Result<Json<SearchResponse>, AppError> {
    if request.query.trim().is_empty() {
        return Err(AppError(ApiError::invalid_request("query must not be empty")));
    }
    if request.limit > 500 {
        return Err(AppError(ApiError::invalid_request("limit must be between 1 and 500")));
    }
    // Zero means "use the configured default", not an error (§8).
    let limit = if request.limit == 0 { state.config.search.default_limit } else { request.limit };
    let levels = request.levels.clone().unwrap_or_else(|| state.config.search.default_levels.clone());

    let filters = SearchFilters {
        levels,
        path_prefix: request.path_prefix.clone(),
        subproject_ids: request.subproject_ids.clone().unwrap_or_default(),
        languages: Vec::new(),
    };

    let started = Instant::now();
    let results = state.search.search_filtered(&request.query, limit, &filters).await?;

    let mut hits = Vec::with_capacity(results.len());
    for r in results {
        let parent = match &r.parent_id {
            Some(parent_id) => state
                .store
                .get_chunk(parent_id)?
                .map(|p| ParentRef { id: p.id, name: p.name, level: p.level.as_str().to_string() }),
            None => None,
        };
        hits.push(SearchHit {
            chunk_id: r.chunk_id,
            file_path: r.file_path,
            start_line: r.start_line,
            end_line: r.end_line,
            level: r.level,
            name: r.name,
            content: r.content,
            score: r.score,
            subproject_id: r.subproject_id,
            parent,
        });
    }

    Ok(Json(SearchResponse {
        results: hits,
        query: request.query,
        took_ms: started.elapsed().as_millis() as u64,
    }))
}
