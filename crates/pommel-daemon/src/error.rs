use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use pommel_protocol::ApiError;

/// Newtype so this crate can implement `IntoResponse` for
/// [`pommel_protocol::ApiError`] without violating the orphan rule.
pub struct AppError(pub ApiError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        (status, Json(self.0)).into_response()
    }
}

impl From<pommel_store::StoreError> for AppError {
    fn from(err: pommel_store::StoreError) -> Self {
        Self(ApiError::internal(err.to_string()))
    }
}

impl From<pommel_search::SearchError> for AppError {
    fn from(err: pommel_search::SearchError) -> Self {
        Self(ApiError::internal(err.to_string()))
    }
}

impl From<pommel_indexer::IndexerError> for AppError {
    fn from(err: pommel_indexer::IndexerError) -> Self {
        match err {
            pommel_indexer::IndexerError::Busy => Self(ApiError::conflict("a reindex is already in progress")),
            other => Self(ApiError::internal(other.to_string())),
        }
    }
}
