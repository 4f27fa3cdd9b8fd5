use std::{future::Future, sync::Arc, time::Duration};

use anyhow::{anyhow, Context, Result};
use redis::{aio::ConnectionManager, Client};
use tokio::sync::OnceCell;
use tracing::info;

#[derive(Clone)]
pub struct RedisService {
    client: Client,
    // One shared, self-reconnecting connection; created on first use
    manager: Arc<OnceCell<ConnectionManager>>,
    // Upper bound for connecting and for every command round-trip
    timeout: Duration,
}

impl std::fmt::Debug for RedisService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedisService")
            .field("connected", &self.manager.initialized())
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RedisService {
    pub fn new(redis_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::open(redis_url)
            .context("Failed to create Redis client")?;
        Ok(Self {
            client,
            manager: Arc::new(OnceCell::new()),
            timeout,
        })
    }

    pub async fn initialize(&self) -> Result<()> {
        let mut conn = self.connection().await?;

        // Simple ping to verify connection
        let _: () = self
            .bounded("PING", redis::cmd("PING").query_async(&mut conn))
            .await?;

        info!("Redis connection established successfully");
        Ok(())
    }

    /// Shared connection manager; clones are cheap and multiplex one socket
    pub async fn connection(&self) -> Result<ConnectionManager> {
        let client: Client = self.client.clone();
        let manager: &ConnectionManager = self
            .bounded(
                "connect",
                self.manager.get_or_try_init(|| ConnectionManager::new(client)),
            )
            .await?;
        Ok(manager.clone())
    }

    async fn bounded<T, F>(&self, operation: &str, fut: F) -> Result<T>
    where
        F: Future<Output = redis::RedisResult<T>>,
    {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| anyhow!("Redis {operation} timed out after {:?}", self.timeout))?
            .with_context(|| format!("Redis {operation} failed"))
    }

    /// Increments the fixed-window counter for `key`, starting the window on
    /// first hit. Returns the new count and the seconds left in the window.
    pub async fn incr_window(&self, key: &str, window_secs: u64) -> Result<(u64, u64)> {
        let mut conn: ConnectionManager = self.connection().await?;

        let (count, ttl): (u64, i64) = self
            .bounded(
                "INCR",
                redis::pipe()
                    .atomic()
                    .cmd("INCR").arg(key)
                    .cmd("TTL").arg(key)
                    .query_async(&mut conn),
            )
            .await?;

        // A key without expiry was just created (or lost its TTL)
        if ttl < 0 {
            let _: () = self
                .bounded(
                    "EXPIRE",
                    redis::cmd("EXPIRE").arg(key).arg(window_secs).query_async(&mut conn),
                )
                .await?;
            return Ok((count, window_secs));
        }

        Ok((count, ttl as u64))
    }
}
