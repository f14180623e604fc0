//! Application state for shared services

use std::sync::Arc;

use crate::domain::user::{PageRequest, User, UserId, UserRepository};
use crate::domain::DomainError;
use crate::infrastructure::user::{
    CreateUserRequest, PasswordHasher, UpdateUserRequest, UserService,
};

/// Application state shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub user_service: Arc<dyn UserServiceTrait>,
}

impl AppState {
    pub fn new(user_service: Arc<dyn UserServiceTrait>) -> Self {
        Self { user_service }
    }
}

/// User service operations used by the HTTP layer
#[async_trait::async_trait]
pub trait UserServiceTrait: Send + Sync {
    async fn find_all(&self, page: &PageRequest) -> Result<Vec<User>, DomainError>;
    async fn find_one(&self, id: UserId) -> Result<User, DomainError>;
    async fn create(&self, request: CreateUserRequest) -> Result<User, DomainError>;
    async fn update(&self, id: UserId, request: UpdateUserRequest) -> Result<User, DomainError>;
    async fn remove(&self, id: UserId) -> Result<(), DomainError>;
    /// Readiness probe against the store
    async fn check_store(&self) -> Result<(), DomainError>;
    /// Readiness probe against the cache
    async fn check_cache(&self) -> Result<(), DomainError>;
}

#[async_trait::async_trait]
impl<R, H> UserServiceTrait for UserService<R, H>
where
    R: UserRepository + ?Sized + 'static,
    H: PasswordHasher + 'static,
{
    async fn find_all(&self, page: &PageRequest) -> Result<Vec<User>, DomainError> {
        UserService::find_all(self, page).await
    }

    async fn find_one(&self, id: UserId) -> Result<User, DomainError> {
        UserService::find_one(self, id).await
    }

    async fn create(&self, request: CreateUserRequest) -> Result<User, DomainError> {
        UserService::create(self, request).await
    }

    async fn update(&self, id: UserId, request: UpdateUserRequest) -> Result<User, DomainError> {
        UserService::update(self, id, request).await
    }

    async fn remove(&self, id: UserId) -> Result<(), DomainError> {
        UserService::remove(self, id).await
    }

    async fn check_store(&self) -> Result<(), DomainError> {
        UserService::check_store(self).await
    }

    async fn check_cache(&self) -> Result<(), DomainError> {
        UserService::check_cache(self).await
    }
}
