//! Shared cache on Redis

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use redis::aio::ConnectionManager;
use redis::{Client, Cmd, FromRedisValue};
use tokio::sync::OnceCell;
use tracing::{info, warn};

use crate::domain::cache::Cache;
use crate::domain::DomainError;

pub const DEFAULT_OP_TIMEOUT: Duration = Duration::from_millis(500);

#[derive(Debug, Clone)]
pub struct RedisCacheConfig {
    pub url: String,
    /// Prepended as `<prefix>:` to every key
    pub key_prefix: Option<String>,
    /// Upper bound on a single command, so a stalled server reads as unavailable
    pub op_timeout: Duration,
}

impl RedisCacheConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            key_prefix: None,
            op_timeout: DEFAULT_OP_TIMEOUT,
        }
    }

    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = Some(prefix.into());
        self
    }

    pub fn with_op_timeout(mut self, timeout: Duration) -> Self {
        self.op_timeout = timeout;
        self
    }

    fn namespaced(&self, key: &str) -> String {
        match &self.key_prefix {
            Some(prefix) => format!("{}:{}", prefix, key),
            None => key.to_string(),
        }
    }
}

/// Redis-backed cache
///
/// Entries are written with `SET .. PX` so Redis expires them server-side
/// at millisecond precision. The `ConnectionManager` is built on first
/// successful contact and reconnects on its own after that. Until then every
/// command retries the connection and fails as a cache error.
#[derive(Clone)]
pub struct RedisCache {
    client: Client,
    connection: Arc<OnceCell<ConnectionManager>>,
    config: RedisCacheConfig,
}

impl fmt::Debug for RedisCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RedisCache")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl RedisCache {
    /// Parse the URL without contacting the server
    pub fn new(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let client = Client::open(config.url.as_str())
            .map_err(|e| DomainError::cache(format!("Invalid Redis URL: {}", e)))?;

        Ok(Self {
            client,
            connection: Arc::new(OnceCell::new()),
            config,
        })
    }

    /// Parse the URL and try to connect once
    ///
    /// Only a malformed URL is an error. An unreachable server is logged and
    /// the connection is retried on later commands.
    pub async fn connect(config: RedisCacheConfig) -> Result<Self, DomainError> {
        let cache = Self::new(config)?;

        match cache.connection().await {
            Ok(_) => info!("Connected to Redis"),
            Err(e) => warn!(error = %e, "Redis unreachable, cache misses until it is back"),
        }

        Ok(cache)
    }

    async fn connection(&self) -> Result<ConnectionManager, DomainError> {
        let manager = self
            .connection
            .get_or_try_init(|| async {
                tokio::time::timeout(
                    self.config.op_timeout,
                    ConnectionManager::new(self.client.clone()),
                )
                .await
                .map_err(|_| DomainError::cache("Timed out connecting to Redis"))?
                .map_err(|e| DomainError::cache(format!("Failed to connect to Redis: {}", e)))
            })
            .await?;

        Ok(manager.clone())
    }

    async fn run<T: FromRedisValue>(&self, cmd: Cmd, key: &str) -> Result<T, DomainError> {
        let mut conn = self.connection().await?;

        match tokio::time::timeout(self.config.op_timeout, cmd.query_async(&mut conn)).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(DomainError::cache(format!("Redis error on '{}': {}", key, e))),
            Err(_) => Err(DomainError::cache(format!(
                "Redis timed out after {:?} on '{}'",
                self.config.op_timeout, key
            ))),
        }
    }
}

/// Whole milliseconds, at least one so a tiny TTL still expires
fn ttl_millis(ttl: Duration) -> u64 {
    u64::try_from(ttl.as_millis()).unwrap_or(u64::MAX).max(1)
}

#[async_trait]
impl Cache for RedisCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        let mut cmd = redis::cmd("GET");
        cmd.arg(self.config.namespaced(key));

        self.run(cmd, key).await
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let mut cmd = redis::cmd("SET");
        cmd.arg(self.config.namespaced(key))
            .arg(value)
            .arg("PX")
            .arg(ttl_millis(ttl));

        self.run(cmd, key).await
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        let mut cmd = redis::cmd("DEL");
        cmd.arg(self.config.namespaced(key));

        let removed: u64 = self.run(cmd, key).await?;
        Ok(removed > 0)
    }
}
