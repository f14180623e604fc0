//! User entity and related types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::validation::{validate_user_id, UserValidationError};

/// Store-assigned user identifier, always positive
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(i64);

impl UserId {
    /// Create a new UserId after validation
    pub fn new(id: i64) -> Result<Self, UserValidationError> {
        if id <= 0 {
            return Err(UserValidationError::InvalidId(id.to_string()));
        }

        Ok(Self(id))
    }

    /// Parse an id from its textual form
    pub fn parse(raw: &str) -> Result<Self, UserValidationError> {
        validate_user_id(raw).map(Self)
    }

    pub fn value(&self) -> i64 {
        self.0
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Caller-editable profile fields of a user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub first_name: String,
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub is_active: bool,
}

/// User record as exposed to callers and cached
///
/// Carries no password digest; that lives only in the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    id: UserId,
    first_name: String,
    #[serde(default)]
    middle_name: Option<String>,
    last_name: String,
    email: String,
    phone: String,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    /// Soft-delete marker, never serialized
    #[serde(skip_serializing, default)]
    deleted_at: Option<DateTime<Utc>>,
}

impl User {
    /// Create a freshly inserted user
    pub fn new(id: UserId, profile: UserProfile, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            first_name: profile.first_name,
            middle_name: profile.middle_name,
            last_name: profile.last_name,
            email: profile.email,
            phone: profile.phone,
            is_active: profile.is_active,
            created_at,
            updated_at: created_at,
            deleted_at: None,
        }
    }

    /// Restore the mutable timestamps of a persisted row
    pub fn with_timestamps(
        mut self,
        updated_at: DateTime<Utc>,
        deleted_at: Option<DateTime<Utc>>,
    ) -> Self {
        self.updated_at = updated_at;
        self.deleted_at = deleted_at;
        self
    }

    // Getters

    pub fn id(&self) -> UserId {
        self.id
    }

    pub fn first_name(&self) -> &str {
        &self.first_name
    }

    pub fn middle_name(&self) -> Option<&str> {
        self.middle_name.as_deref()
    }

    pub fn last_name(&self) -> &str {
        &self.last_name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn phone(&self) -> &str {
        &self.phone
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Soft-deleted records are invisible to every read path
    pub fn is_deleted(&self) -> bool {
        self.deleted_at.is_some()
    }

    // Mutators

    /// Merge the supplied fields and refresh `updated_at`
    pub fn apply(&mut self, changes: &UserChanges, now: DateTime<Utc>) {
        if let Some(first_name) = &changes.first_name {
            self.first_name = first_name.clone();
        }

        if let Some(middle_name) = &changes.middle_name {
            self.middle_name = middle_name.clone();
        }

        if let Some(last_name) = &changes.last_name {
            self.last_name = last_name.clone();
        }

        if let Some(email) = &changes.email {
            self.email = email.clone();
        }

        if let Some(phone) = &changes.phone {
            self.phone = phone.clone();
        }

        if let Some(is_active) = changes.is_active {
            self.is_active = is_active;
        }

        self.updated_at = now;
    }

    /// Mark the record soft-deleted
    pub fn mark_deleted(&mut self, now: DateTime<Utc>) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(now);
        }
    }
}

/// Fields persisted by an insert; the password is already hashed
#[derive(Debug, Clone)]
pub struct NewUser {
    pub profile: UserProfile,
    pub password_hash: String,
}

/// Partial field replacement applied by an update
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserChanges {
    pub first_name: Option<String>,
    /// `Some(None)` clears the middle name
    pub middle_name: Option<Option<String>>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub is_active: Option<bool>,
    pub password_hash: Option<String>,
}

impl UserChanges {
    /// True when no field would change
    pub fn is_empty(&self) -> bool {
        self == &Self::default()
    }
}
