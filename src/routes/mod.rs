//! Route modules for the Document Analyzer

pub mod analyzer;
pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::state::AppState;

/// Build the application router
pub fn router(state: AppState) -> Router {
    let body_limit = state.config().upload.max_upload_bytes();

    Router::new()
        .route("/health", get(health::health_check))
        .route("/api/v1/health", get(health::health_check))
        .merge(analyzer::router())
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
