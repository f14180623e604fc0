//! Domain layer - Core entities, traits and errors

pub mod cache;
pub mod error;
pub mod user;

pub use cache::{Cache, CacheExt, CacheKey};
pub use error::{Dependency, DomainError};
pub use user::{
    NewUser, PageRequest, SortOrder, User, UserChanges, UserId, UserProfile, UserRepository,
    UserValidationError,
};
