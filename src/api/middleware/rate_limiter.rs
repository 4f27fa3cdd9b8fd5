// Fixed-window request rate limiting per client

use std::{
    collections::HashMap,
    net::SocketAddr,
    sync::Arc,
    time::{Duration, Instant},
};

use axum::{
    extract::{ConnectInfo, Request, State},
    http::{HeaderMap, HeaderValue},
    middleware::Next,
    response::{IntoResponse, Response},
};
use parking_lot::Mutex;
use tracing::{debug, warn};

use crate::config::state::AppState;
use crate::database::RedisService;
use crate::utils::AppError;

pub const RATE_LIMIT_LIMIT_HEADER: &str = "x-ratelimit-limit";
pub const RATE_LIMIT_REMAINING_HEADER: &str = "x-ratelimit-remaining";

// Expired windows are swept once the table grows past this size,
// at most once per window length
const SWEEP_THRESHOLD: usize = 10_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u64,
    pub remaining: u64,
    pub retry_after_secs: u64,
}

#[derive(Debug, Clone, Copy)]
struct Window {
    count: u64,
    started: Instant,
}

#[derive(Debug)]
struct MemoryWindows {
    windows: HashMap<String, Window>,
    last_sweep: Instant,
}

impl MemoryWindows {
    fn new(now: Instant) -> Self {
        Self { windows: HashMap::new(), last_sweep: now }
    }

    /// Counts a hit for `key`; returns the count and seconds until the window resets
    fn hit(&mut self, key: &str, now: Instant, window: Duration) -> (u64, u64) {
        if self.windows.len() > SWEEP_THRESHOLD && now.duration_since(self.last_sweep) >= window {
            self.windows.retain(|_, w| now.duration_since(w.started) < window);
            self.last_sweep = now;
        }

        let entry: &mut Window = self
            .windows
            .entry(key.to_string())
            .or_insert(Window { count: 0, started: now });

        if now.duration_since(entry.started) >= window {
            entry.count = 0;
            entry.started = now;
        }

        entry.count += 1;
        let elapsed: Duration = now.duration_since(entry.started);
        let resets_in: u64 = window.saturating_sub(elapsed).as_secs_f64().ceil() as u64;
        (entry.count, resets_in)
    }
}

#[derive(Debug, Clone)]
enum Backend {
    Memory(Arc<Mutex<MemoryWindows>>),
    Redis(RedisService),
}

#[derive(Debug, Clone)]
pub struct RateLimiter {
    max_requests: u64,
    window: Duration,
    backend: Backend,
}

impl RateLimiter {
    pub fn in_memory(max_requests: u64, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            backend: Backend::Memory(Arc::new(Mutex::new(MemoryWindows::new(Instant::now())))),
        }
    }

    pub fn redis(redis: RedisService, max_requests: u64, window_secs: u64) -> Self {
        Self {
            max_requests,
            window: Duration::from_secs(window_secs),
            backend: Backend::Redis(redis),
        }
    }

    pub fn backend_name(&self) -> &'static str {
        match self.backend {
            Backend::Memory(_) => "memory",
            Backend::Redis(_) => "redis",
        }
    }

    /// Counts one request for `key` and decides whether it may proceed
    pub async fn check(&self, key: &str) -> RateLimitDecision {
        let (count, resets_in) = match &self.backend {
            Backend::Memory(windows) => {
                let mut windows = windows.lock();
                windows.hit(key, Instant::now(), self.window)
            }
            Backend::Redis(redis) => {
                let redis_key: String = format!("ratelimit:{key}");
                match redis.incr_window(&redis_key, self.window.as_secs()).await {
                    Ok(hit) => hit,
                    Err(e) => {
                        // Fail open, timeouts included
                        warn!("Rate limiter backend unavailable: {:#}", e);
                        return RateLimitDecision {
                            allowed: true,
                            limit: self.max_requests,
                            remaining: self.max_requests,
                            retry_after_secs: 0,
                        };
                    }
                }
            }
        };

        RateLimitDecision {
            allowed: count <= self.max_requests,
            limit: self.max_requests,
            remaining: self.max_requests.saturating_sub(count),
            retry_after_secs: resets_in.max(1),
        }
    }
}

/// Client key: first X-Forwarded-For hop, then the peer address
pub fn client_key(headers: &HeaderMap, peer: Option<SocketAddr>) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.split(',').next())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| "anonymous".to_string())
}

/// Middleware that rejects clients exceeding the configured request rate
pub async fn rate_limit_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let peer: Option<SocketAddr> = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| *addr);
    let key: String = client_key(request.headers(), peer);

    let decision: RateLimitDecision = state.rate_limiter.check(&key).await;

    if !decision.allowed {
        debug!("Rate limit exceeded for {}", key);
        return AppError::RateLimited { retry_after_secs: decision.retry_after_secs }.into_response();
    }

    let mut response: Response = next.run(request).await;
    let headers: &mut HeaderMap = response.headers_mut();
    headers.insert(RATE_LIMIT_LIMIT_HEADER, HeaderValue::from(decision.limit));
    headers.insert(RATE_LIMIT_REMAINING_HEADER, HeaderValue::from(decision.remaining));
    response
}
