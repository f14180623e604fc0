//! Embedded schema migrations for the users table

use async_trait::async_trait;
use sqlx::postgres::PgPool;
use tracing::info;

use crate::domain::DomainError;

/// Runs and reverts schema migrations
#[async_trait]
pub trait Migrator: Send + Sync {
    /// Applies every pending migration, oldest first
    async fn run(&self) -> Result<(), DomainError>;

    /// Reverts the most recently applied migration
    async fn revert(&self) -> Result<(), DomainError>;

    /// Returns the latest applied version
    async fn version(&self) -> Result<Option<i64>, DomainError>;
}

/// Represents a database migration
#[derive(Debug, Clone)]
pub struct Migration {
    pub version: i64,
    pub description: String,
    /// SQL to run when applying the migration
    pub up: String,
    /// SQL to run when reverting the migration
    pub down: String,
}

impl Migration {
    pub fn new(
        version: i64,
        description: impl Into<String>,
        up: impl Into<String>,
        down: impl Into<String>,
    ) -> Self {
        Self {
            version,
            description: description.into(),
            up: up.into(),
            down: down.into(),
        }
    }
}

/// Migrations for the user store, in ascending version order
pub fn user_migrations() -> Vec<Migration> {
    vec![
        Migration::new(
            1,
            "Create users table",
            r#"
            CREATE TABLE IF NOT EXISTS users (
                id BIGSERIAL PRIMARY KEY,
                first_name VARCHAR(100) NOT NULL,
                middle_name VARCHAR(100),
                last_name VARCHAR(100) NOT NULL,
                email VARCHAR(320) NOT NULL,
                password_hash TEXT NOT NULL,
                phone VARCHAR(32) NOT NULL,
                is_active BOOLEAN NOT NULL DEFAULT TRUE,
                created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
                deleted_at TIMESTAMPTZ
            )
            "#,
            "DROP TABLE IF EXISTS users",
        ),
        Migration::new(
            2,
            "Enforce unique email among non-deleted users",
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS users_email_active_key
                ON users (email)
                WHERE deleted_at IS NULL
            "#,
            "DROP INDEX IF EXISTS users_email_active_key",
        ),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Up,
    Down,
}

impl Direction {
    fn verb(self) -> &'static str {
        match self {
            Self::Up => "apply",
            Self::Down => "revert",
        }
    }
}

/// PostgreSQL migrator recording applied versions in `_migrations`
///
/// Each step runs its SQL and its bookkeeping row in one transaction, so a
/// failed step leaves neither behind.
#[derive(Debug)]
pub struct PostgresMigrator {
    pool: PgPool,
    migrations: Vec<Migration>,
}

impl PostgresMigrator {
    /// Migrator over [`user_migrations`]
    pub fn new(pool: PgPool) -> Self {
        Self::with_migrations(pool, user_migrations())
    }

    pub fn with_migrations(pool: PgPool, migrations: Vec<Migration>) -> Self {
        Self { pool, migrations }
    }

    async fn ensure_ledger(&self) -> Result<(), DomainError> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS _migrations (
                version BIGINT PRIMARY KEY,
                description TEXT NOT NULL,
                installed_on TIMESTAMPTZ NOT NULL DEFAULT NOW()
            )
            "#,
        )
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to create migration ledger: {}", e)))?;

        Ok(())
    }

    async fn applied_versions(&self) -> Result<Vec<i64>, DomainError> {
        sqlx::query_scalar("SELECT version FROM _migrations ORDER BY version")
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to read migration ledger: {}", e)))
    }

    async fn step(&self, migration: &Migration, direction: Direction) -> Result<(), DomainError> {
        let fail = |stage: &str, e: sqlx::Error| {
            DomainError::storage(format!(
                "Failed to {} migration {} ({}): {}",
                direction.verb(),
                migration.version,
                stage,
                e
            ))
        };

        let mut tx = self.pool.begin().await.map_err(|e| fail("begin", e))?;

        let (sql, ledger) = match direction {
            Direction::Up => (
                &migration.up,
                sqlx::query("INSERT INTO _migrations (version, description) VALUES ($1, $2)")
                    .bind(migration.version)
                    .bind(&migration.description),
            ),
            Direction::Down => (
                &migration.down,
                sqlx::query("DELETE FROM _migrations WHERE version = $1").bind(migration.version),
            ),
        };

        sqlx::Executor::execute(&mut *tx, sqlx::raw_sql(sql))
            .await
            .map_err(|e| fail("schema", e))?;
        ledger.execute(&mut *tx).await.map_err(|e| fail("ledger", e))?;
        tx.commit().await.map_err(|e| fail("commit", e))?;

        info!(
            version = migration.version,
            description = %migration.description,
            action = direction.verb(),
            "Migration step complete"
        );

        Ok(())
    }
}

#[async_trait]
impl Migrator for PostgresMigrator {
    async fn run(&self) -> Result<(), DomainError> {
        self.ensure_ledger().await?;
        let applied = self.applied_versions().await?;

        for migration in self.migrations.iter().filter(|m| !applied.contains(&m.version)) {
            self.step(migration, Direction::Up).await?;
        }

        Ok(())
    }

    async fn revert(&self) -> Result<(), DomainError> {
        let Some(current) = self.version().await? else {
            info!("No migrations to revert");
            return Ok(());
        };

        let migration = self
            .migrations
            .iter()
            .find(|m| m.version == current)
            .ok_or_else(|| {
                DomainError::configuration(format!(
                    "Applied migration {} is not known to this build",
                    current
                ))
            })?;

        self.step(migration, Direction::Down).await
    }

    async fn version(&self) -> Result<Option<i64>, DomainError> {
        self.ensure_ledger().await?;
        Ok(self.applied_versions().await?.last().copied())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_creation() {
        let migration = Migration::new(1, "Test migration", "CREATE TABLE test", "DROP TABLE test");

        assert_eq!(migration.version, 1);
        assert_eq!(migration.description, "Test migration");
        assert_eq!(migration.up, "CREATE TABLE test");
        assert_eq!(migration.down, "DROP TABLE test");
    }

    #[test]
    fn test_user_migrations_ascending_and_complete() {
        let migrations = user_migrations();

        assert!(!migrations.is_empty());
        for pair in migrations.windows(2) {
            assert!(pair[1].version > pair[0].version);
        }
        for migration in &migrations {
            assert!(!migration.description.is_empty());
            assert!(!migration.up.trim().is_empty());
            assert!(!migration.down.trim().is_empty());
        }
    }

    #[test]
    fn test_direction_verbs() {
        assert_eq!(Direction::Up.verb(), "apply");
        assert_eq!(Direction::Down.verb(), "revert");
    }

    #[test]
    fn test_email_index_is_partial_on_deleted_at() {
        let migrations = user_migrations();
        let index = migrations
            .iter()
            .find(|m| m.up.contains("CREATE UNIQUE INDEX"))
            .unwrap();

        assert!(index.up.contains("(email)"));
        assert!(index.up.contains("WHERE deleted_at IS NULL"));
    }
}
