use axum::{routing::{get, post}, Router};
use crate::config::state::AppState;
use super::handler;

/// Messaging routes, nested under `/chat`
pub fn chat_routes() -> Router<AppState> {
    Router::new()
        .route("/send", post(handler::send_message))
        .route("/messages", get(handler::list_messages))
        .route("/messages/{username}", get(handler::conversation))
}
