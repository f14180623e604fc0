//! Cache backend selection

use std::sync::Arc;

use tracing::info;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

use super::in_memory::{InMemoryCache, DEFAULT_MAX_CAPACITY};
use super::redis::{RedisCache, RedisCacheConfig};

/// Which cache backend to build, with its settings
#[derive(Debug, Clone)]
pub enum CacheConfig {
    InMemory { max_capacity: u64 },
    Redis(RedisCacheConfig),
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::InMemory {
            max_capacity: DEFAULT_MAX_CAPACITY,
        }
    }
}

impl CacheConfig {
    pub fn backend_name(&self) -> &'static str {
        match self {
            Self::InMemory { .. } => "in_memory",
            Self::Redis(_) => "redis",
        }
    }
}

/// Builds the cache the service is handed
#[derive(Debug, Default)]
pub struct CacheFactory;

impl CacheFactory {
    pub fn new() -> Self {
        Self
    }

    /// A malformed Redis URL is an error. An unreachable Redis is not: its
    /// commands fail as cache errors until it connects.
    pub async fn create(&self, config: &CacheConfig) -> Result<Arc<dyn Cache>, DomainError> {
        let cache: Arc<dyn Cache> = match config {
            CacheConfig::InMemory { max_capacity } => Arc::new(InMemoryCache::new(*max_capacity)),
            CacheConfig::Redis(redis) => Arc::new(RedisCache::connect(redis.clone()).await?),
        };

        info!(backend = config.backend_name(), "Cache ready");

        Ok(cache)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_default_builds_working_in_memory_cache() {
        let cache = CacheFactory::new()
            .create(&CacheConfig::default())
            .await
            .unwrap();

        cache
            .set_raw("user:1", "{}", Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.get_raw("user:1").await.unwrap().as_deref(), Some("{}"));
    }

    #[tokio::test]
    async fn test_unreachable_redis_still_builds_and_store_serves() {
        use crate::domain::Dependency;
        use crate::infrastructure::user::{
            CreateUserRequest, InMemoryUserRepository, PlainHasher, UserService,
            UserServiceConfig,
        };

        let redis = RedisCacheConfig::new("redis://127.0.0.1:1")
            .with_op_timeout(Duration::from_millis(200));
        let config = CacheConfig::Redis(redis);
        let cache = CacheFactory::new().create(&config).await.unwrap();

        assert!(matches!(
            cache.get_raw("user:1").await,
            Err(DomainError::DependencyUnavailable {
                dependency: Dependency::Cache,
                ..
            })
        ));

        let service = UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(PlainHasher),
            cache,
            UserServiceConfig::default(),
        );
        let created = service
            .create(CreateUserRequest {
                first_name: "Grace".to_string(),
                middle_name: None,
                last_name: "Hopper".to_string(),
                email: "grace@x.com".to_string(),
                password: "cobol-1959".to_string(),
                phone: "+1 202 555 0100".to_string(),
                is_active: None,
            })
            .await
            .unwrap();

        assert_eq!(service.find_one(created.id()).await.unwrap(), created);
        assert!(service.check_cache().await.is_err());
    }

    #[tokio::test]
    async fn test_invalid_redis_url_is_cache_error() {
        let config = CacheConfig::Redis(RedisCacheConfig::new("not a url"));

        let result = CacheFactory::new().create(&config).await;

        assert!(matches!(
            result,
            Err(DomainError::DependencyUnavailable { .. })
        ));
    }

    #[test]
    fn test_backend_name() {
        assert_eq!(CacheConfig::default().backend_name(), "in_memory");
        assert_eq!(
            CacheConfig::Redis(RedisCacheConfig::new("redis://cache")).backend_name(),
            "redis"
        );
    }
}
