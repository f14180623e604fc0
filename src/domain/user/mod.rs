//! User domain
//!
//! This module provides domain types and traits for user records,
//! including the entity, pagination, validation, and the repository trait.

mod entity;
mod page;
mod repository;
mod validation;

pub use entity::{NewUser, User, UserChanges, UserId, UserProfile};
pub use page::{PageRequest, SortOrder, DEFAULT_PAGE_LIMIT, MAX_PAGE_LIMIT};
pub use repository::UserRepository;
pub use validation::{
    normalize_email, validate_email, validate_name, validate_password, validate_phone,
    validate_user_id, UserValidationError,
};
