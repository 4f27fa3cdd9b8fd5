use axum::{http::StatusCode, Json};
use serde_json::{json, Value};

/// Plain greeting used to check the API from a browser
pub async fn welcome() -> (StatusCode, Json<Value>) {
    (StatusCode::OK, Json(json!({ "msg": "Welcome to the API!" })))
}
