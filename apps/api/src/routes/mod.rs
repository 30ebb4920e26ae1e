pub mod applications;
pub mod health;

use axum::{extract::DefaultBodyLimit, routing::get, Router};

use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    let body_limit = state.config.max_upload_bytes;

    Router::new()
        .route("/health", get(health::health_handler))
        .route(
            "/api/v1/applications",
            get(applications::handle_search).post(applications::handle_submit),
        )
        .route(
            "/api/v1/applications/recent",
            get(applications::handle_recent),
        )
        .route(
            "/api/v1/applications/:id/resume",
            get(applications::handle_download),
        )
        .route("/api/v1/stats", get(applications::handle_stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(state)
}
