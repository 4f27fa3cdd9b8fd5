//! tests/global_errors/429.rs
//! Ensures the per-client limiter answers 429 once the window is exhausted.

#[path = "../mod.rs"]
mod common;

use reqwest::{header::RETRY_AFTER, StatusCode};
use serde_json::Value;

#[tokio::test]
async fn returns_429_after_the_window_is_exhausted() {
    let app = common::spawn_app_with(&[
        ("RATE_LIMIT_MAX_REQUESTS", "3"),
        ("RATE_LIMIT_WINDOW_SECONDS", "60"),
    ])
    .await;

    for expected_remaining in ["2", "1", "0"] {
        let resp: reqwest::Response = app
            .client
            .get(app.url("/"))
            .send()
            .await
            .expect("Failed to execute request.");

        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(resp.headers()["x-ratelimit-limit"], "3");
        assert_eq!(resp.headers()["x-ratelimit-remaining"], expected_remaining);
    }

    let resp: reqwest::Response = app
        .client
        .get(app.url("/"))
        .send()
        .await
        .expect("Failed to execute request.");

    assert_eq!(resp.status(), StatusCode::TOO_MANY_REQUESTS);

    let retry_after: u64 = resp.headers()[RETRY_AFTER]
        .to_str()
        .unwrap()
        .parse()
        .unwrap();
    assert!((1..=60).contains(&retry_after));

    let json: Value = resp.json().await.unwrap();
    assert_eq!(json["status"], "TOO_MANY_REQUESTS");
    assert_eq!(json["code"], 429);
}
