//! tests/global_errors/413.rs
//! Ensures that sending a payload above MAX_REQUEST_BODY_SIZE (2MB in tests) triggers 413.

#[path = "../mod.rs"]
mod common;

use reqwest::StatusCode;
use serde_json::Value;

#[tokio::test]
async fn returns_413_when_payload_exceeds_global_limit() {
    let app = common::spawn_app().await;

    // Slightly larger than the configured 2MB limit
    let oversized_payload: Vec<u8> = vec![b'X'; 2_097_152 + 100];

    let resp: reqwest::Response = app
        .client
        .post(app.url("/auth/register"))
        .header("content-type", "application/json")
        .body(oversized_payload)
        .send()
        .await
        .expect("Failed to send large request.");

    assert_eq!(resp.status(), StatusCode::PAYLOAD_TOO_LARGE);

    let body: String = resp.text().await.unwrap();
    let json: Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "PAYLOAD_TOO_LARGE");
    assert_eq!(json["code"], 413);
}
