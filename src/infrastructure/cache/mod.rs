//! Cache backends behind the domain `Cache` port

mod factory;
mod in_memory;
mod redis;

pub use factory::{CacheConfig, CacheFactory};
pub use in_memory::InMemoryCache;
pub use self::redis::{RedisCache, RedisCacheConfig};
