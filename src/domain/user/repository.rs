//! User repository trait

use async_trait::async_trait;
use std::fmt::Debug;

use super::entity::{NewUser, User, UserChanges, UserId};
use super::page::PageRequest;
use crate::domain::DomainError;

/// Durable user storage
///
/// Every read filters out soft-deleted rows. Implementations must enforce
/// email uniqueness among non-deleted rows themselves and report a violation
/// as [`DomainError::DuplicateKey`].
#[async_trait]
pub trait UserRepository: Send + Sync + Debug {
    /// Up to `limit` visible users ordered by id, skipping `offset`
    async fn find_page(&self, page: &PageRequest) -> Result<Vec<User>, DomainError>;

    /// Get a visible user by id
    async fn find_by_id(&self, id: UserId) -> Result<Option<User>, DomainError>;

    /// Get the visible user holding this email
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, DomainError>;

    /// Persist a new user, assigning its id and timestamps
    async fn insert(&self, user: NewUser) -> Result<User, DomainError>;

    /// Merge fields into a visible user and refresh `updated_at`
    async fn apply_update(&self, id: UserId, changes: &UserChanges) -> Result<User, DomainError>;

    /// Set `deleted_at`; returns the number of rows affected (0 or 1)
    async fn soft_delete(&self, id: UserId) -> Result<u64, DomainError>;
}
