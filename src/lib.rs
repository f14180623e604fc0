//! User Records API
//!
//! CRUD service for user records backed by a relational store, with a
//! read-through cache in front of point lookups and paginated listings.

pub mod api;
pub mod cli;
pub mod config;
pub mod domain;
pub mod infrastructure;

pub use crate::config::AppConfig;

use std::sync::Arc;

use api::state::AppState;
use crate::config::StoreBackend;
use domain::user::UserRepository;
use domain::DomainError;
use infrastructure::{
    cache::CacheFactory,
    storage::{connect_pool, Migrator, PostgresMigrator},
    user::{Argon2Hasher, InMemoryUserRepository, PostgresUserRepository, UserService},
};
use tracing::info;

/// Create the application state with default configuration
pub async fn create_app_state() -> anyhow::Result<AppState> {
    create_app_state_with_config(&AppConfig::default()).await
}

/// Create the application state with custom configuration
pub async fn create_app_state_with_config(config: &AppConfig) -> anyhow::Result<AppState> {
    let repository = create_user_repository(config).await?;
    let cache = CacheFactory::new()
        .create(&config.cache.cache_config()?)
        .await?;

    info!(
        store = ?config.database.backend,
        cache = ?config.cache.backend,
        list_invalidation = %config.cache.list_invalidation,
        "User service initialized"
    );

    let service = UserService::new(
        repository,
        Arc::new(Argon2Hasher::new()),
        cache,
        config.cache.service_config(),
    );

    Ok(AppState::new(Arc::new(service)))
}

async fn create_user_repository(
    config: &AppConfig,
) -> Result<Arc<dyn UserRepository>, DomainError> {
    match config.database.backend {
        StoreBackend::InMemory => {
            info!("Using in-memory user store");
            Ok(Arc::new(InMemoryUserRepository::new()))
        }
        StoreBackend::Postgres => {
            let postgres = config.database.postgres().ok_or_else(|| {
                DomainError::configuration("database.url is required for the postgres backend")
            })?;
            let pool = connect_pool(&postgres).await?;

            if config.database.run_migrations {
                PostgresMigrator::new(pool.clone()).run().await?;
            }

            info!("Using PostgreSQL user store");
            Ok(Arc::new(PostgresUserRepository::new(pool)))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheBackend;
    use crate::domain::user::PageRequest;

    #[tokio::test]
    async fn test_default_state_serves_empty_listing() {
        let state = create_app_state().await.unwrap();

        let users = state
            .user_service
            .find_all(&PageRequest::default())
            .await
            .unwrap();

        assert!(users.is_empty());
        state.user_service.check_store().await.unwrap();
        state.user_service.check_cache().await.unwrap();
    }

    #[tokio::test]
    async fn test_postgres_without_url_is_rejected() {
        let mut config = AppConfig::default();
        config.database.backend = StoreBackend::Postgres;
        config.database.url = None;

        let result = create_app_state_with_config(&config).await;

        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_unreachable_redis_does_not_block_startup() {
        let mut config = AppConfig::default();
        config.cache.backend = CacheBackend::Redis;
        config.cache.redis_url = Some("redis://127.0.0.1:1".to_string());
        config.cache.redis_timeout_ms = 200;

        let state = create_app_state_with_config(&config).await.unwrap();

        assert!(state
            .user_service
            .find_all(&PageRequest::default())
            .await
            .unwrap()
            .is_empty());
        assert!(state.user_service.check_cache().await.is_err());
    }
}
