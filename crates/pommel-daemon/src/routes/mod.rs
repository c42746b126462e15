mod config;
mod health;
mod reindex;
mod search;
mod status;
mod subprojects;

use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::time::Duration;
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health::health))
        .route("/status", get(status::status))
        .route("/search", post(search::search))
        .route("/reindex", post(reindex::reindex))
        .route("/subprojects", get(subprojects::subprojects))
        .route("/config", get(config::config))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(30)))
        .with_state(state)
}
