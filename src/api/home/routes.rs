use axum::{routing::get, Router};

use crate::config::state::AppState;
use super::handler;

pub fn home_routes() -> Router<AppState> {
    Router::new().route("/", get(handler::welcome))
}
