//! Cache port

use std::fmt::Debug;
use std::future::Future;
use std::time::Duration;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

use super::CacheKey;
use crate::domain::DomainError;

/// Key/value cache holding JSON strings with a per-entry TTL
///
/// Only point deletes exist. Backends are not expected to support prefix or
/// pattern deletes, so page entries cannot be swept by key shape.
#[async_trait]
pub trait Cache: Send + Sync + Debug {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError>;

    /// Writes `value`, replacing any previous entry and its TTL
    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError>;

    /// Returns whether an entry was removed
    async fn delete(&self, key: &str) -> Result<bool, DomainError>;
}

/// Typed access addressed by [`CacheKey`]
pub trait CacheExt: Cache {
    /// Reads and decodes an entry; an undecodable entry is a cache error
    fn load<'a, V>(
        &'a self,
        key: &'a CacheKey,
    ) -> impl Future<Output = Result<Option<V>, DomainError>> + Send
    where
        V: DeserializeOwned + Send,
    {
        async move {
            let Some(json) = self.get_raw(&key.to_string()).await? else {
                return Ok(None);
            };

            serde_json::from_str(&json)
                .map(Some)
                .map_err(|e| DomainError::cache(format!("Undecodable entry at '{}': {}", key, e)))
        }
    }

    fn store<'a, V>(
        &'a self,
        key: &'a CacheKey,
        value: &'a V,
        ttl: Duration,
    ) -> impl Future<Output = Result<(), DomainError>> + Send
    where
        V: Serialize + Send + Sync,
    {
        async move {
            let json = serde_json::to_string(value)
                .map_err(|e| DomainError::cache(format!("Unencodable entry at '{}': {}", key, e)))?;

            self.set_raw(&key.to_string(), &json, ttl).await
        }
    }

    fn evict<'a>(
        &'a self,
        key: &'a CacheKey,
    ) -> impl Future<Output = Result<bool, DomainError>> + Send {
        async move { self.delete(&key.to_string()).await }
    }
}

impl<T: Cache + ?Sized> CacheExt for T {}


#[cfg(test)]
mod tests {
    use super::mock::MockCache;
    use super::*;
    use crate::domain::user::{PageRequest, SortOrder, UserId};

    fn point() -> CacheKey {
        CacheKey::user(UserId::new(7).unwrap())
    }

    #[tokio::test]
    async fn test_store_then_load_uses_rendered_key() {
        let cache = MockCache::new();

        cache
            .store(&point(), &vec![1, 2, 3], Duration::from_secs(60))
            .await
            .unwrap();

        assert_eq!(cache.raw("user:7").as_deref(), Some("[1,2,3]"));
        assert_eq!(cache.ttl_of("user:7"), Some(Duration::from_secs(60)));

        let loaded: Option<Vec<u32>> = cache.load(&point()).await.unwrap();
        assert_eq!(loaded, Some(vec![1, 2, 3]));
    }

    #[tokio::test]
    async fn test_load_missing_is_none() {
        let cache = MockCache::new();
        let page = CacheKey::page(&PageRequest::new(0, 5, SortOrder::Desc).unwrap());

        let loaded: Option<Vec<u32>> = cache.load(&page).await.unwrap();

        assert!(loaded.is_none());
        assert_eq!(cache.get_count(), 1);
    }

    #[tokio::test]
    async fn test_undecodable_entry_is_cache_error() {
        let cache = MockCache::new();
        cache
            .set_raw("user:7", "{not json", Duration::from_secs(60))
            .await
            .unwrap();

        let loaded: Result<Option<Vec<u32>>, _> = cache.load(&point()).await;

        assert!(matches!(
            loaded,
            Err(DomainError::DependencyUnavailable { .. })
        ));
    }

    #[tokio::test]
    async fn test_evict_reports_removal() {
        let cache = MockCache::new().with_entry("user:7", &"x", Duration::from_secs(60));

        assert!(cache.evict(&point()).await.unwrap());
        assert!(!cache.evict(&point()).await.unwrap());
        assert_eq!(cache.delete_count(), 2);
    }

    #[tokio::test]
    async fn test_failing_mode_counts_and_errors() {
        let cache = MockCache::new();
        cache.set_failing(true);

        assert!(cache.get_raw("k").await.is_err());
        assert!(cache.set_raw("k", "v", Duration::from_secs(1)).await.is_err());
        assert!(cache.delete("k").await.is_err());
        assert_eq!(
            (cache.get_count(), cache.set_count(), cache.delete_count()),
            (1, 1, 1)
        );

        cache.set_failing(false);
        assert!(cache.get_raw("k").await.unwrap().is_none());
    }
}
