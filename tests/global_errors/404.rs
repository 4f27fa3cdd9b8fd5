//! tests/global_errors/404.rs
//! Ensures that hitting an unknown route returns an enveloped HTTP 404.

// Include the helper module defined in tests/mod.rs.
#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn returns_404_for_nonexistent_route() {
    let app = common::spawn_app().await;

    let resp: reqwest::Response = app
        .client
        .get(app.url("/does-not-exist"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    let body: String = resp.text().await.unwrap();
    let json: Value = serde_json::from_str(&body).unwrap();

    assert_eq!(json["status"], "NOT_FOUND");
    assert_eq!(json["code"], 404);
    assert!(json["messages"].is_array());
}

#[tokio::test]
async fn unknown_paths_under_a_group_prefix_are_404() {
    let app = common::spawn_app().await;

    let resp: reqwest::Response = app
        .client
        .get(app.url("/chat/unknown"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
