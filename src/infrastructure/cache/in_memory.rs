//! Process-local cache on moka

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use moka::future::Cache as MokaCache;
use moka::Expiry;

use crate::domain::cache::Cache;
use crate::domain::DomainError;

pub const DEFAULT_MAX_CAPACITY: u64 = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    json: Arc<str>,
    ttl: Duration,
}

/// Each write restarts the clock with the TTL it carries
struct WrittenTtl;

impl Expiry<String, Entry> for WrittenTtl {
    fn expire_after_create(&self, _key: &String, entry: &Entry, _at: Instant) -> Option<Duration> {
        Some(entry.ttl)
    }

    fn expire_after_update(
        &self,
        _key: &String,
        entry: &Entry,
        _at: Instant,
        _remaining: Option<Duration>,
    ) -> Option<Duration> {
        Some(entry.ttl)
    }
}

/// Bounded in-memory cache
///
/// Expired entries are never returned, even before moka reclaims them.
/// Past `max_capacity` the least useful entries are dropped first.
#[derive(Debug)]
pub struct InMemoryCache {
    entries: MokaCache<String, Entry>,
    max_capacity: u64,
}

impl InMemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let entries = MokaCache::builder()
            .max_capacity(max_capacity)
            .expire_after(WrittenTtl)
            .build();

        Self {
            entries,
            max_capacity,
        }
    }

    pub fn max_capacity(&self) -> u64 {
        self.max_capacity
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_CAPACITY)
    }
}

#[async_trait]
impl Cache for InMemoryCache {
    async fn get_raw(&self, key: &str) -> Result<Option<String>, DomainError> {
        Ok(self
            .entries
            .get(key)
            .await
            .map(|entry| entry.json.to_string()))
    }

    async fn set_raw(&self, key: &str, value: &str, ttl: Duration) -> Result<(), DomainError> {
        let entry = Entry {
            json: Arc::from(value),
            ttl,
        };

        self.entries.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, DomainError> {
        Ok(self.entries.remove(key).await.is_some())
    }
}
