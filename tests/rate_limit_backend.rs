//! tests/rate_limit_backend.rs
//! The Redis-backed limiter fails open when Redis is down or stalls.

#[path = "mod.rs"]
mod common;

use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tokio::net::TcpListener;

/// Accepts connections and never writes a byte back
async fn silent_redis() -> String {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((socket, _)) = listener.accept().await {
            held.push(socket);
        }
    });

    format!("redis://{addr}")
}

/// An address nothing listens on
async fn unreachable_redis() -> String {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    format!("redis://{addr}")
}

async fn assert_requests_pass_promptly(redis_url: &str) {
    let app = common::spawn_app_with(&[
        ("REDIS_URL", redis_url),
        ("REDIS_TIMEOUT_MS", "200"),
        ("DEFAULT_TIMEOUT_SECONDS", "1"),
        ("RATE_LIMIT_MAX_REQUESTS", "3"),
    ])
    .await;
    assert_eq!(app.state.rate_limiter.backend_name(), "redis");

    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(10))
        .build()
        .unwrap();

    // More requests than the limit: an unavailable backend never blocks
    for _ in 0..5 {
        let started = Instant::now();
        let resp = client
            .get(app.url("/"))
            .send()
            .await
            .expect("Request was never answered");

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(started.elapsed() < Duration::from_secs(3), "took {:?}", started.elapsed());
        assert_eq!(resp.headers()["x-ratelimit-limit"], "3");
        assert_eq!(resp.headers()["x-ratelimit-remaining"], "3");
    }
}

#[tokio::test]
async fn stalled_redis_fails_open() {
    let redis_url: String = silent_redis().await;
    assert_requests_pass_promptly(&redis_url).await;
}

#[tokio::test]
async fn unreachable_redis_fails_open() {
    let redis_url: String = unreachable_redis().await;
    assert_requests_pass_promptly(&redis_url).await;
}
