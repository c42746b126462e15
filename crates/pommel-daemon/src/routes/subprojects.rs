use crate::error::AppError;
use crate::state::AppState;
use axum::extract::State;
use axum::Json;
use pommel_protocol::{SubprojectInfo, SubprojectsResponse};

pub async fn subprojects(State(state): State<AppState>) -> Result<Json<SubprojectsResponse>, AppError> {
    let records = state.store.list_subprojects()?;
    let subprojects = records
        .into_iter()
        .map(|r| SubprojectInfo {
            id: r.id,
            path: r.path,
            name: r.name,
            marker_kind: r.marker_kind,
        })
        .collect();
    Ok(Json(SubprojectsResponse { subprojects }))
}
