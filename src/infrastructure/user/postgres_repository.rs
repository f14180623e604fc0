//! PostgreSQL user repository implementation

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};

use crate::domain::user::{
    NewUser, PageRequest, SortOrder, User, UserChanges, UserId, UserProfile, UserRepository,
};
use crate::domain::DomainError;

const USER_COLUMNS: &str = "id, first_name, middle_name, last_name, email, phone, is_active, \
                            created_at, updated_at, deleted_at";

/// PostgreSQL implementation of UserRepository
///
/// Email uniqueness is enforced by the partial index
/// `users_email_active_key ON users (email) WHERE deleted_at IS NULL`.
#[derive(Debug, Clone)]
pub struct PostgresUserRepository {
    pool: PgPool,
}

impl PostgresUserRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl UserRepository for PostgresUserRepository {
    async fn find_page(&self, page: &PageRequest) -> Result<Vec<User>, DomainError> {
        let direction = match page.order() {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        };
        let sql = format!(
            "SELECT {} FROM users WHERE deleted_at IS NULL ORDER BY id {} LIMIT $1 OFFSET $2",
            USER_COLUMNS, direction
        );

        let rows = sqlx::query(&sql)
            .bind(i64::from(page.limit()))
            .bind(page.offset() as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to list users: {}", e)))?;

        rows.iter().map(row_to_user).collect()
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let sql = format!(
            "SELECT {} FROM users WHERE id = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id.value())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let sql = format!(
            "SELECT {} FROM users WHERE email = $1 AND deleted_at IS NULL",
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| DomainError::storage(format!("Failed to get user by email: {}", e)))?;

        row.as_ref().map(row_to_user).transpose()
    }

    async fn insert(&self, user: NewUser) -> Result<User, DomainError> {
        let sql = format!(
            r#"
            INSERT INTO users (first_name, middle_name, last_name, email, password_hash,
                               phone, is_active)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {}
            "#,
            USER_COLUMNS
        );
        let profile = &user.profile;

        let row = sqlx::query(&sql)
            .bind(&profile.first_name)
            .bind(&profile.middle_name)
            .bind(&profile.last_name)
            .bind(&profile.email)
            .bind(&user.password_hash)
            .bind(&profile.phone)
            .bind(profile.is_active)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_write_error(e, &profile.email, "create"))?;

        row_to_user(&row)
    }

    async fn apply_update(&self, id: UserId, changes: &UserChanges) -> Result<User, DomainError> {
        let sql = format!(
            r#"
            UPDATE users
            SET first_name = COALESCE($2, first_name),
                middle_name = CASE WHEN $9 THEN $3 ELSE middle_name END,
                last_name = COALESCE($4, last_name),
                email = COALESCE($5, email),
                phone = COALESCE($6, phone),
                is_active = COALESCE($7, is_active),
                password_hash = COALESCE($8, password_hash),
                updated_at = NOW()
            WHERE id = $1 AND deleted_at IS NULL
            RETURNING {}
            "#,
            USER_COLUMNS
        );

        let row = sqlx::query(&sql)
            .bind(id.value())
            .bind(&changes.first_name)
            .bind(changes.middle_name.clone().flatten())
            .bind(&changes.last_name)
            .bind(&changes.email)
            .bind(&changes.phone)
            .bind(changes.is_active)
            .bind(&changes.password_hash)
            .bind(changes.middle_name.is_some())
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| {
                map_write_error(e, changes.email.as_deref().unwrap_or_default(), "update")
            })?;

        match row {
            Some(row) => row_to_user(&row),
            None => Err(DomainError::not_found(id.value())),
        }
    }

    async fn soft_delete(&self, id: UserId) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE users SET deleted_at = NOW() WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(id.value())
        .execute(&self.pool)
        .await
        .map_err(|e| DomainError::storage(format!("Failed to delete user: {}", e)))?;

        Ok(result.rows_affected())
    }
}

/// Unique violations become `DuplicateKey`; everything else is a store outage
fn map_write_error(err: sqlx::Error, email: &str, action: &str) -> DomainError {
    let unique_violation = err
        .as_database_error()
        .map(|db| db.is_unique_violation())
        .unwrap_or(false);

    if unique_violation {
        DomainError::duplicate_key(email)
    } else {
        DomainError::storage(format!("Failed to {} user: {}", action, err))
    }
}

fn row_to_user(row: &PgRow) -> Result<User, DomainError> {
    let raw_id: i64 = row.get("id");
    let id = UserId::new(raw_id)
        .map_err(|e| DomainError::internal(format!("Invalid user id in store: {}", e)))?;

    let profile = UserProfile {
        first_name: row.get("first_name"),
        middle_name: row.get("middle_name"),
        last_name: row.get("last_name"),
        email: row.get("email"),
        phone: row.get("phone"),
        is_active: row.get("is_active"),
    };

    let created_at: DateTime<Utc> = row.get("created_at");
    let updated_at: DateTime<Utc> = row.get("updated_at");
    let deleted_at: Option<DateTime<Utc>> = row.get("deleted_at");

    Ok(User::new(id, profile, created_at).with_timestamps(updated_at, deleted_at))
}
