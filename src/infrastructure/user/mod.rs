//! User infrastructure module
//!
//! This module provides the user service with its read-through caching,
//! password hashing with Argon2, and the in-memory and PostgreSQL stores.

mod password;
mod postgres_repository;
mod repository;
mod service;

pub use password::{Argon2Hasher, PasswordHasher};
pub use postgres_repository::PostgresUserRepository;
pub use repository::InMemoryUserRepository;
pub use service::{
    CreateUserRequest, ListInvalidation, UpdateUserRequest, UserService, UserServiceConfig,
};

#[cfg(test)]
pub use password::mock::PlainHasher;
