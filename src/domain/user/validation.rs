//! User field validation utilities

use once_cell::sync::Lazy;
use regex::Regex;
use thiserror::Error;
use validator::ValidateEmail;

use crate::domain::DomainError;

/// Errors that can occur during user validation
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("User ID must be a positive integer, got '{0}'")]
    InvalidId(String),

    #[error("{0} cannot be empty")]
    EmptyName(&'static str),

    #[error("{0} exceeds maximum length of {1} characters")]
    NameTooLong(&'static str, usize),

    #[error("Email cannot be empty")]
    EmptyEmail,

    #[error("Email '{0}' is not a valid address")]
    InvalidEmail(String),

    #[error("Password is too short. Minimum length is {0} characters")]
    PasswordTooShort(usize),

    #[error("Password exceeds maximum length of {0} characters")]
    PasswordTooLong(usize),

    #[error("Phone '{0}' is not a valid phone number")]
    InvalidPhone(String),

    #[error("offset must be zero or greater, got {0}")]
    InvalidOffset(i64),

    #[error("limit must be between 1 and {1}, got {0}")]
    InvalidLimit(i64, u32),

    #[error("order must be 'asc' or 'desc', got '{0}'")]
    InvalidSortOrder(String),
}

impl UserValidationError {
    /// Request field the error is about
    pub fn field(&self) -> &'static str {
        match self {
            Self::InvalidId(_) => "id",
            Self::EmptyName(field) | Self::NameTooLong(field, _) => *field,
            Self::EmptyEmail | Self::InvalidEmail(_) => "email",
            Self::PasswordTooShort(_) | Self::PasswordTooLong(_) => "password",
            Self::InvalidPhone(_) => "phone",
            Self::InvalidOffset(_) => "offset",
            Self::InvalidLimit(..) => "limit",
            Self::InvalidSortOrder(_) => "order",
        }
    }
}

impl From<UserValidationError> for DomainError {
    fn from(err: UserValidationError) -> Self {
        DomainError::invalid_input(err.to_string())
    }
}

const MAX_NAME_LENGTH: usize = 100;
const MIN_PASSWORD_LENGTH: usize = 6;
const MAX_PASSWORD_LENGTH: usize = 128;

static PHONE_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^\+?[0-9][0-9 ()\-]{5,19}$").expect("phone pattern is valid"));

/// Validate a user ID supplied as text (e.g. from a URL path)
pub fn validate_user_id(raw: &str) -> Result<i64, UserValidationError> {
    match raw.trim().parse::<i64>() {
        Ok(id) if id > 0 => Ok(id),
        _ => Err(UserValidationError::InvalidId(raw.to_string())),
    }
}

/// Validate a first, middle or last name
///
/// Rules:
/// - Cannot be empty or whitespace only
/// - Maximum 100 characters
pub fn validate_name(field: &'static str, value: &str) -> Result<(), UserValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyName(field));
    }

    if trimmed.chars().count() > MAX_NAME_LENGTH {
        return Err(UserValidationError::NameTooLong(field, MAX_NAME_LENGTH));
    }

    Ok(())
}

/// Validate an email address
pub fn validate_email(email: &str) -> Result<(), UserValidationError> {
    let trimmed = email.trim();

    if trimmed.is_empty() {
        return Err(UserValidationError::EmptyEmail);
    }

    if !trimmed.validate_email() {
        return Err(UserValidationError::InvalidEmail(email.to_string()));
    }

    Ok(())
}

/// Canonical form used for storage and uniqueness checks
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate a raw password
///
/// Rules:
/// - Minimum 6 characters
/// - Maximum 128 characters
pub fn validate_password(password: &str) -> Result<(), UserValidationError> {
    let length = password.chars().count();

    if length < MIN_PASSWORD_LENGTH {
        return Err(UserValidationError::PasswordTooShort(MIN_PASSWORD_LENGTH));
    }

    if length > MAX_PASSWORD_LENGTH {
        return Err(UserValidationError::PasswordTooLong(MAX_PASSWORD_LENGTH));
    }

    Ok(())
}

/// Validate a phone number: optional leading '+', digits, spaces, dashes and parentheses
pub fn validate_phone(phone: &str) -> Result<(), UserValidationError> {
    if !PHONE_PATTERN.is_match(phone.trim()) {
        return Err(UserValidationError::InvalidPhone(phone.to_string()));
    }

    Ok(())
}
