//! tests/mod.rs
//! A shared test helper to spawn the API on an ephemeral port.

#![allow(dead_code)]

use std::{collections::HashMap, net::SocketAddr, path::PathBuf};

use axum::Router;
use reqwest::StatusCode;
use serde_json::{json, Value};
use sentinel_chat_api::{create_app, ensure_directories, AppState, EnvironmentVariables};
use tempfile::TempDir;
use tokio::net::TcpListener;

pub const ALLOWED_ORIGIN: &str = "http://localhost:3000";
pub const PASSWORD: &str = "correct-horse-battery";

pub struct TestApp {
    pub base_url: String,
    pub client: reqwest::Client,
    pub state: AppState,
    pub log_dir: PathBuf,
    pub upload_dir: PathBuf,
    // Keeps the temporary directories alive for the duration of the test
    _dir: TempDir,
}

pub struct Tokens {
    pub access: String,
    pub refresh: String,
}

/// Test configuration rooted in a temporary directory
pub fn test_vars(dir: &TempDir, overrides: &[(&str, &str)]) -> HashMap<String, String> {
    let mut vars: HashMap<String, String> = HashMap::new();
    vars.insert("ENVIRONMENT".into(), "test".into());
    vars.insert("JWT_SECRET_KEY".into(), "integration-test-secret".into());
    vars.insert("ALLOWED_ORIGIN".into(), ALLOWED_ORIGIN.into());
    vars.insert("LOG_DIR".into(), dir.path().join("logs").display().to_string());
    vars.insert("UPLOAD_DIR".into(), dir.path().join("uploads").display().to_string());
    vars.insert("MAX_REQUEST_BODY_SIZE".into(), "2097152".into());
    vars.insert("DEFAULT_TIMEOUT_SECONDS".into(), "5".into());
    vars.insert("RATE_LIMIT_MAX_REQUESTS".into(), "1000".into());
    vars.insert("BCRYPT_COST".into(), "4".into());

    for (key, value) in overrides {
        vars.insert(key.to_string(), value.to_string());
    }
    vars
}

/// Serves an already-built router on a random local port
pub async fn serve(app: Router) -> String {
    let listener: TcpListener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let addr: SocketAddr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())
            .await
            .expect("Server failed");
    });

    format!("http://{}", addr)
}

pub async fn spawn_app() -> TestApp {
    spawn_app_with(&[]).await
}

/// Spawns the app with configuration overrides and returns a handle to it.
pub async fn spawn_app_with(overrides: &[(&str, &str)]) -> TestApp {
    let dir: TempDir = tempfile::tempdir().expect("Failed to create temp dir");
    let env: EnvironmentVariables =
        EnvironmentVariables::from_vars(&test_vars(&dir, overrides)).expect("Invalid test config");

    ensure_directories(&env).await.expect("Failed to create directories");

    let log_dir: PathBuf = PathBuf::from(env.log_dir.to_string());
    let upload_dir: PathBuf = PathBuf::from(env.upload_dir.to_string());
    let state: AppState = AppState::new(env).expect("Failed to build state");
    let app: Router = create_app(state.clone()).expect("Failed to build app");

    TestApp {
        base_url: serve(app).await,
        client: reqwest::Client::new(),
        state,
        log_dir,
        upload_dir,
        _dir: dir,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to register")
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.url("/auth/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("Failed to log in")
    }

    /// Registers `username` and returns its token pair
    pub async fn signup(&self, username: &str) -> Tokens {
        let registered = self.register(username, PASSWORD).await;
        assert_eq!(registered.status(), StatusCode::CREATED);

        let response = self.login(username, PASSWORD).await;
        assert_eq!(response.status(), StatusCode::OK);

        let body: Value = response.json().await.unwrap();
        Tokens {
            access: body["data"]["access_token"].as_str().unwrap().to_string(),
            refresh: body["data"]["refresh_token"].as_str().unwrap().to_string(),
        }
    }

    pub async fn get_authed(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("Failed to execute request.")
    }

    pub async fn post_json_authed(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.url(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("Failed to execute request.")
    }
}
