use std::time::Duration;

use serde::Deserialize;

use crate::domain::DomainError;
use crate::infrastructure::cache::{CacheConfig, RedisCacheConfig};
use crate::infrastructure::observability::MetricsConfig;
use crate::infrastructure::storage::PostgresConfig;
use crate::infrastructure::user::{ListInvalidation, UserServiceConfig};

/// Application configuration
///
/// Loaded from `config/default.*`, `config/local.*` and `APP__*` environment
/// variables, later sources overriding earlier ones. Every section is
/// optional and falls back to its defaults.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub logging: LoggingConfig,
    pub database: DatabaseConfig,
    pub cache: CacheSettings,
    pub metrics: MetricsConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Which user store to run against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    InMemory,
    Postgres,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub backend: StoreBackend,
    /// Required when `backend` is `postgres`
    pub url: Option<String>,
    pub max_connections: u32,
    pub min_connections: u32,
    pub connect_timeout_secs: u64,
    pub idle_timeout_secs: u64,
    /// Apply pending migrations on `serve` startup
    pub run_migrations: bool,
}

/// Which cache to front the store with
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum CacheBackend {
    #[default]
    InMemory,
    Redis,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    /// Required when `backend` is `redis`
    pub redis_url: Option<String>,
    pub key_prefix: Option<String>,
    /// Per-command bound for Redis, in milliseconds
    pub redis_timeout_ms: u64,
    pub default_ttl_secs: u64,
    /// Entry cap of the in-memory cache, and of the page keys remembered
    /// for tracked invalidation
    pub max_capacity: u64,
    pub list_invalidation: ListInvalidation,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        let pool = PostgresConfig::default();

        Self {
            backend: StoreBackend::default(),
            url: None,
            max_connections: pool.max_connections,
            min_connections: pool.min_connections,
            connect_timeout_secs: pool.acquire_timeout.as_secs(),
            idle_timeout_secs: pool.idle_timeout.as_secs(),
            run_migrations: true,
        }
    }
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            backend: CacheBackend::default(),
            redis_url: None,
            key_prefix: None,
            redis_timeout_ms: 500,
            default_ttl_secs: 60,
            max_capacity: 10_000,
            list_invalidation: ListInvalidation::default(),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self, config::ConfigError> {
        let config = config::Config::builder()
            .add_source(config::File::with_name("config/default").required(false))
            .add_source(config::File::with_name("config/local").required(false))
            .add_source(
                config::Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Reject combinations that cannot start
    pub fn validate(&self) -> Result<(), DomainError> {
        if self.database.backend == StoreBackend::Postgres && self.database.url.is_none() {
            return Err(DomainError::configuration(
                "database.url is required when database.backend is postgres",
            ));
        }

        if self.cache.backend == CacheBackend::Redis && self.cache.redis_url.is_none() {
            return Err(DomainError::configuration(
                "cache.redis_url is required when cache.backend is redis",
            ));
        }

        if self.cache.default_ttl_secs == 0 {
            return Err(DomainError::configuration(
                "cache.default_ttl_secs must be greater than zero",
            ));
        }

        self.metrics.validate()
    }
}

impl DatabaseConfig {
    /// Pool settings, when a URL is configured
    pub fn postgres(&self) -> Option<PostgresConfig> {
        self.url.as_ref().map(|url| {
            PostgresConfig::new(url.clone())
                .with_pool_size(self.min_connections, self.max_connections)
                .with_timeouts(
                    Duration::from_secs(self.connect_timeout_secs),
                    Duration::from_secs(self.idle_timeout_secs),
                )
        })
    }
}

impl CacheSettings {
    pub fn cache_config(&self) -> Result<CacheConfig, DomainError> {
        match self.backend {
            CacheBackend::InMemory => Ok(CacheConfig::InMemory {
                max_capacity: self.max_capacity,
            }),
            CacheBackend::Redis => {
                let url = self.redis_url.clone().ok_or_else(|| {
                    DomainError::configuration("cache.redis_url is required for the redis backend")
                })?;

                let mut redis = RedisCacheConfig::new(url)
                    .with_op_timeout(Duration::from_millis(self.redis_timeout_ms));
                if let Some(prefix) = &self.key_prefix {
                    redis = redis.with_key_prefix(prefix.clone());
                }

                Ok(CacheConfig::Redis(redis))
            }
        }
    }

    pub fn service_config(&self) -> UserServiceConfig {
        UserServiceConfig::default()
            .with_default_ttl(Duration::from_secs(self.default_ttl_secs))
            .with_list_invalidation(self.list_invalidation)
            .with_tracked_pages_capacity(self.max_capacity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn from_json(json: &str) -> AppConfig {
        config::Config::builder()
            .add_source(config::File::from_str(json, config::FileFormat::Json))
            .build()
            .unwrap()
            .try_deserialize()
            .unwrap()
    }

    #[test]
    fn test_defaults() {
        let config = AppConfig::default();

        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.server.port, 8080);
        assert_eq!(config.logging.format, LogFormat::Pretty);
        assert_eq!(config.database.backend, StoreBackend::InMemory);
        assert_eq!(config.database.max_connections, 10);
        assert!(config.database.run_migrations);
        assert_eq!(config.cache.backend, CacheBackend::InMemory);
        assert_eq!(config.cache.default_ttl_secs, 60);
        assert_eq!(config.cache.list_invalidation, ListInvalidation::Ttl);
        assert!(config.metrics.enabled);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_sections_keep_defaults() {
        let config = from_json(
            r#"{
                "server": {"port": 3000},
                "cache": {"default_ttl_secs": 15, "list_invalidation": "tracked"},
                "logging": {"format": "json"}
            }"#,
        );

        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.logging.format, LogFormat::Json);
        assert_eq!(config.logging.level, "info");

        let service = config.cache.service_config();
        assert_eq!(service.default_ttl, Duration::from_secs(15));
        assert_eq!(service.list_invalidation, ListInvalidation::Tracked);
        assert_eq!(service.tracked_pages_capacity, config.cache.max_capacity);
    }

    #[test]
    fn test_postgres_requires_url() {
        let config = from_json(r#"{"database": {"backend": "postgres"}}"#);
        assert!(matches!(
            config.validate(),
            Err(DomainError::Configuration { .. })
        ));

        let config = from_json(
            r#"{"database": {"backend": "postgres", "url": "postgres://db/users", "max_connections": 3}}"#,
        );
        assert!(config.validate().is_ok());

        let pool = config.database.postgres().unwrap();
        assert_eq!(pool.url, "postgres://db/users");
        assert_eq!(pool.max_connections, 3);
    }

    #[test]
    fn test_redis_requires_url() {
        let config = from_json(r#"{"cache": {"backend": "redis"}}"#);
        assert!(config.validate().is_err());

        let config = from_json(
            r#"{"cache": {"backend": "redis", "redis_url": "redis://cache:6379", "key_prefix": "users"}}"#,
        );
        match config.cache.cache_config().unwrap() {
            CacheConfig::Redis(redis) => {
                assert_eq!(redis.url, "redis://cache:6379");
                assert_eq!(redis.key_prefix.as_deref(), Some("users"));
                assert_eq!(redis.op_timeout, Duration::from_millis(500));
            }
            other => panic!("expected redis, got {:?}", other),
        }
    }

    #[test]
    fn test_zero_ttl_rejected() {
        let config = from_json(r#"{"cache": {"default_ttl_secs": 0}}"#);
        assert!(config.validate().is_err());
    }
}
