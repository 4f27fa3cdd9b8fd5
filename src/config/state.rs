// Application state shared by every handler and middleware

use std::{sync::Arc, time::Duration};
use crate::api::middleware::{RateLimiter, RequestLog};
use crate::config::environment::EnvironmentVariables;
use crate::database::{FileStore, MessageStore, RedisService, UserStore};
use crate::security::{ThreatDetector, ThreatLog, TokenService};

const REQUEST_LOG_CAPACITY: usize = 1000;
const THREAT_LOG_CAPACITY: usize = 500;

#[derive(Clone)]
pub struct AppState {
    pub environment: Arc<EnvironmentVariables>,
    pub tokens: TokenService,
    pub users: UserStore,
    pub messages: MessageStore,
    pub files: FileStore,
    pub rate_limiter: RateLimiter,
    pub request_log: RequestLog,
    pub threat_detector: ThreatDetector,
    pub threat_log: ThreatLog,
    pub redis: Option<RedisService>,
}

impl AppState {
    /// Builds the state from configuration; no I/O happens here
    pub fn new(environment: EnvironmentVariables) -> anyhow::Result<Self> {
        let environment_arc: Arc<EnvironmentVariables> = Arc::new(environment);
        let env: &EnvironmentVariables = &environment_arc;

        let tokens: TokenService = TokenService::new(
            &env.jwt_secret_key,
            env.access_token_ttl_seconds,
            env.refresh_token_ttl_seconds,
        );

        let redis: Option<RedisService> = env
            .redis_url
            .as_deref()
            .map(|url| RedisService::new(url, Duration::from_millis(env.redis_timeout_ms)))
            .transpose()?;

        let rate_limiter: RateLimiter = match &redis {
            Some(redis) => RateLimiter::redis(
                redis.clone(),
                env.rate_limit_max_requests,
                env.rate_limit_window_seconds,
            ),
            None => RateLimiter::in_memory(env.rate_limit_max_requests, env.rate_limit_window_seconds),
        };

        Ok(Self {
            tokens,
            users: UserStore::new(),
            messages: MessageStore::new(),
            files: FileStore::new(env.upload_dir.to_string()),
            rate_limiter,
            request_log: RequestLog::new(env.log_dir.to_string(), REQUEST_LOG_CAPACITY),
            threat_detector: ThreatDetector::new(),
            threat_log: ThreatLog::new(THREAT_LOG_CAPACITY),
            redis,
            environment: environment_arc,
        })
    }

    /// Connects external services; Redis is optional and only pinged when configured
    pub async fn init_services(&self) -> anyhow::Result<()> {
        if let Some(redis) = &self.redis {
            redis.initialize().await?;
        }

        tracing::info!(
            "Services initialized (rate limiter backend: {})",
            self.rate_limiter.backend_name()
        );
        Ok(())
    }
}
