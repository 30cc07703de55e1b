//! Router configuration for the web server.

use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use super::handlers;
use super::AppState;

/// Uploads are whole documents; allow up to 200 MiB per request.
const MAX_UPLOAD_BYTES: usize = 200 * 1024 * 1024;

/// Create the main router with all routes.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/file_parse", post(handlers::file_parse))
        .route("/layout_ocr", post(handlers::layout_ocr))
        .route("/layout_ocr/stream", get(handlers::layout_ocr_stream))
        .layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
