// Request logging: tracing events, a JSON-lines file and an in-memory tail

use std::{
    collections::VecDeque,
    net::SocketAddr,
    path::PathBuf,
    sync::Arc,
    time::Instant,
};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::api::middleware::rate_limiter::client_key;
use crate::config::state::AppState;
use crate::security::{ThreatAssessment, ThreatSource};

pub const REQUEST_LOG_FILE: &str = "requests.log";

#[derive(Debug, Clone, Serialize)]
pub struct RequestLogEntry {
    pub timestamp: DateTime<Utc>,
    pub method: String,
    pub path: String,
    pub status: u16,
    pub latency_ms: f64,
    pub client: String,
    pub threat_score: f64,
}

#[derive(Debug, Clone)]
pub struct RequestLog {
    capacity: usize,
    file: PathBuf,
    entries: Arc<RwLock<VecDeque<RequestLogEntry>>>,
}

impl RequestLog {
    pub fn new(log_dir: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            file: log_dir.into().join(REQUEST_LOG_FILE),
            entries: Arc::new(RwLock::new(VecDeque::new())),
        }
    }

    pub fn file_path(&self) -> &PathBuf {
        &self.file
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn push(&self, entry: RequestLogEntry) {
        let mut entries = self.entries.write();
        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(entry);
    }

    /// Newest first
    pub fn recent(&self, limit: usize) -> Vec<RequestLogEntry> {
        self.entries.read().iter().rev().take(limit).cloned().collect()
    }

    /// Appends one JSON line to the log file
    pub async fn append_to_file(&self, entry: &RequestLogEntry) -> anyhow::Result<()> {
        let mut line: Vec<u8> = serde_json::to_vec(entry)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.file)
            .await?;
        file.write_all(&line).await?;
        Ok(())
    }
}

/// Middleware that logs every request and scores its path for threats
pub async fn request_logger(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let started: Instant = Instant::now();
    let method: String = request.method().to_string();
    let path: String = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| request.uri().path().to_string());
    let peer: Option<SocketAddr> = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let client: String = client_key(request.headers(), peer);

    let assessment: ThreatAssessment = state.threat_detector.assess(&path);

    let response: Response = next.run(request).await;

    let entry: RequestLogEntry = RequestLogEntry {
        timestamp: Utc::now(),
        method,
        path,
        status: response.status().as_u16(),
        latency_ms: (started.elapsed().as_secs_f64() * 1_000_000.0).round() / 1_000.0,
        client,
        threat_score: assessment.score,
    };

    info!(
        method = %entry.method,
        path = %entry.path,
        status = entry.status,
        latency_ms = entry.latency_ms,
        client = %entry.client,
        "request handled"
    );

    if assessment.is_malicious() {
        warn!(
            path = %entry.path,
            client = %entry.client,
            score = assessment.score,
            "suspicious request"
        );
        state
            .threat_log
            .record(ThreatSource::Request, &entry.path, &assessment, Some(entry.client.clone()));
    }

    if let Err(e) = state.request_log.append_to_file(&entry).await {
        warn!("Failed to write request log {}: {:#}", state.request_log.file_path().display(), e);
    }
    state.request_log.push(entry);

    response
}
