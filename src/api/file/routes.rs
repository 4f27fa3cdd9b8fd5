use axum::{routing::{get, post}, Router};
use crate::config::state::AppState;
use super::handler;

/// Upload routes, nested under `/file`
pub fn file_routes() -> Router<AppState> {
    Router::new()
        .route("/upload", post(handler::upload))
        .route("/list", get(handler::list_files))
        .route("/{file_id}", get(handler::download))
}
