//! PostgreSQL connection pool

use std::time::Duration;

use sqlx::postgres::{PgPool, PgPoolOptions};
use tracing::info;

use crate::domain::DomainError;

#[derive(Debug, Clone)]
pub struct PostgresConfig {
    pub url: String,
    pub max_connections: u32,
    pub min_connections: u32,
    /// Bound on acquiring a connection, including the first connect
    pub acquire_timeout: Duration,
    pub idle_timeout: Duration,
}

impl Default for PostgresConfig {
    fn default() -> Self {
        Self {
            url: "postgres://localhost/user_records".to_string(),
            max_connections: 10,
            min_connections: 1,
            acquire_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
        }
    }
}

impl PostgresConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            ..Default::default()
        }
    }

    pub fn with_pool_size(mut self, min: u32, max: u32) -> Self {
        self.min_connections = min;
        self.max_connections = max;
        self
    }

    pub fn with_timeouts(mut self, acquire: Duration, idle: Duration) -> Self {
        self.acquire_timeout = acquire;
        self.idle_timeout = idle;
        self
    }

    /// The URL with any password masked, for logs
    pub fn redacted_url(&self) -> String {
        let Some((scheme, rest)) = self.url.split_once("://") else {
            return self.url.clone();
        };
        let Some((userinfo, host)) = rest.rsplit_once('@') else {
            return self.url.clone();
        };

        match userinfo.split_once(':') {
            Some((user, _)) => format!("{}://{}:***@{}", scheme, user, host),
            None => self.url.clone(),
        }
    }
}

/// Open the pool, failing fast if the first connection cannot be made
pub async fn connect_pool(config: &PostgresConfig) -> Result<PgPool, DomainError> {
    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .min_connections(config.min_connections)
        .acquire_timeout(config.acquire_timeout)
        .idle_timeout(config.idle_timeout)
        .connect(&config.url)
        .await
        .map_err(|e| {
            DomainError::storage(format!(
                "Failed to connect to {}: {}",
                config.redacted_url(),
                e
            ))
        })?;

    info!(
        url = %config.redacted_url(),
        max_connections = config.max_connections,
        "Connected to PostgreSQL"
    );

    Ok(pool)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builders() {
        let config = PostgresConfig::new("postgres://db/users")
            .with_pool_size(2, 4)
            .with_timeouts(Duration::from_secs(5), Duration::from_secs(60));

        assert_eq!(config.url, "postgres://db/users");
        assert_eq!((config.min_connections, config.max_connections), (2, 4));
        assert_eq!(config.acquire_timeout, Duration::from_secs(5));
        assert_eq!(config.idle_timeout, Duration::from_secs(60));
    }

    #[test]
    fn test_redacted_url() {
        let with_password = PostgresConfig::new("postgres://app:s3cret@db:5432/users");
        assert_eq!(with_password.redacted_url(), "postgres://app:***@db:5432/users");

        let user_only = PostgresConfig::new("postgres://app@db/users");
        assert_eq!(user_only.redacted_url(), "postgres://app@db/users");

        let bare = PostgresConfig::default();
        assert_eq!(bare.redacted_url(), "postgres://localhost/user_records");
    }
}
