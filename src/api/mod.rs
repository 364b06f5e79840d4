//! HTTP API
//!
//! Routes every `/api/*` endpoint to its handler and applies the request
//! body limit and request logging.

pub mod handlers;
pub mod requests;
pub mod responses;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::middleware;
use axum::routing::{get, post};

use crate::middleware::logging::log_request;
use crate::server::AppState;

/// Build the application router.
pub fn router(state: AppState) -> Router {
    let body_limit = usize::try_from(state.max_upload_bytes()).unwrap_or(usize::MAX);

    Router::new()
        .route("/api/files", get(handlers::list_files))
        .route("/api/upload", post(handlers::upload_file))
        .route("/api/delete", post(handlers::delete_path))
        .route("/api/download/{*path}", get(handlers::download_file))
        .route("/api/create-directory", post(handlers::create_directory))
        .route("/api/bulk-delete", post(handlers::bulk_delete))
        .route("/api/bulk-move", post(handlers::bulk_move))
        .route("/api/bulk-download", post(handlers::bulk_download))
        .route("/api/system-stats", get(handlers::system_stats))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(middleware::from_fn(log_request))
        .with_state(state)
}
