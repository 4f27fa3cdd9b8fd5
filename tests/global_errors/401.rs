//! tests/global_errors/401.rs
//! Protected routes reject missing or malformed credentials.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn returns_401_without_authorization_header() {
    let app = common::spawn_app().await;

    let resp: reqwest::Response = app
        .client
        .get(app.url("/chat/messages"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "UNAUTHORIZED");
    assert_eq!(json["code"], 401);
    assert_eq!(json["messages"][0], "Missing Authorization Header");
}

#[tokio::test]
async fn returns_401_for_garbage_token() {
    let app = common::spawn_app().await;

    let resp: reqwest::Response = app.get_authed("/auth/me", "not.a.token").await;

    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["messages"][0], "Invalid token");
}
