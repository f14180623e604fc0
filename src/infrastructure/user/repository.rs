//! In-memory user repository implementation

use async_trait::async_trait;
use chrono::Utc;
use std::collections::BTreeMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::domain::user::{
    NewUser, PageRequest, SortOrder, User, UserChanges, UserId, UserRepository,
};
use crate::domain::DomainError;

#[derive(Debug, Clone)]
struct StoredUser {
    user: User,
    password_hash: String,
}

#[derive(Debug, Default)]
struct Table {
    rows: BTreeMap<i64, StoredUser>,
    last_id: i64,
}

impl Table {
    /// Holder of `email` among visible rows, other than `except`
    fn email_holder(&self, email: &str, except: Option<i64>) -> Option<i64> {
        self.rows
            .iter()
            .filter(|(id, _)| Some(**id) != except)
            .find(|(_, row)| !row.user.is_deleted() && row.user.email() == email)
            .map(|(id, _)| *id)
    }
}

/// In-memory implementation of UserRepository
///
/// Rows are never physically removed. Email uniqueness is checked under the
/// write lock, so it holds even when callers skip their own pre-check.
#[derive(Debug, Clone, Default)]
pub struct InMemoryUserRepository {
    table: Arc<RwLock<Table>>,
}

impl InMemoryUserRepository {
    /// Create a new empty repository
    pub fn new() -> Self {
        Self::default()
    }

    /// Stored digest for a row, including soft-deleted ones
    pub async fn password_hash(&self, id: UserId) -> Option<String> {
        let table = self.table.read().await;
        table
            .rows
            .get(&id.value())
            .map(|row| row.password_hash.clone())
    }

    /// Total number of rows, soft-deleted ones included
    pub async fn row_count(&self) -> usize {
        self.table.read().await.rows.len()
    }
}

#[async_trait]
impl UserRepository for InMemoryUserRepository {
    async fn find_page(&self, page: &PageRequest) -> Result<Vec<User>, DomainError> {
        let table = self.table.read().await;

        let visible = table.rows.values().filter(|row| !row.user.is_deleted());
        let ordered: Box<dyn Iterator<Item = &StoredUser> + '_> = match page.order() {
            SortOrder::Asc => Box::new(visible),
            SortOrder::Desc => Box::new(visible.rev()),
        };

        Ok(ordered
            .skip(page.offset() as usize)
            .take(page.limit() as usize)
            .map(|row| row.user.clone())
            .collect())
    }

    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError> {
        let table = self.table.read().await;

        Ok(table
            .rows
            .get(&id.value())
            .filter(|row| !row.user.is_deleted())
            .map(|row| row.user.clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError> {
        let table = self.table.read().await;

        Ok(table
            .email_holder(email, None)
            .and_then(|id| table.rows.get(&id))
            .map(|row| row.user.clone()))
    }

    async fn insert(&self, user: NewUser) -> Result<User, DomainError> {
        let mut table = self.table.write().await;

        if table.email_holder(&user.profile.email, None).is_some() {
            return Err(DomainError::duplicate_key(user.profile.email));
        }

        table.last_id += 1;
        let id = UserId::new(table.last_id).map_err(|e| DomainError::internal(e.to_string()))?;
        let created = User::new(id, user.profile, Utc::now());

        table.rows.insert(
            id.value(),
            StoredUser {
                user: created.clone(),
                password_hash: user.password_hash,
            },
        );

        Ok(created)
    }

    async fn apply_update(&self, id: UserId, changes: &UserChanges) -> Result<User, DomainError> {
        let mut table = self.table.write().await;

        if let Some(email) = &changes.email {
            if table.email_holder(email, Some(id.value())).is_some() {
                return Err(DomainError::duplicate_key(email.clone()));
            }
        }

        let row = table
            .rows
            .get_mut(&id.value())
            .filter(|row| !row.user.is_deleted())
            .ok_or_else(|| DomainError::not_found(id.value()))?;

        row.user.apply(changes, Utc::now());
        if let Some(hash) = &changes.password_hash {
            row.password_hash = hash.clone();
        }

        Ok(row.user.clone())
    }

    async fn soft_delete(&self, id: UserId) -> Result<u64, DomainError> {
        let mut table = self.table.write().await;

        match table.rows.get_mut(&id.value()) {
            Some(row) if !row.user.is_deleted() => {
                row.user.mark_deleted(Utc::now());
                Ok(1)
            }
            _ => Ok(0),
        }
    }
}
