//! User service: read-through caching over the user store

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use moka::future::Cache as KeySet;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use tracing::{debug, info, warn};

use crate::domain::cache::{Cache, CacheExt, CacheKey};
use crate::domain::user::{
    normalize_email, validate_email, validate_name, validate_password, validate_phone, NewUser,
    PageRequest, User, UserChanges, UserId, UserProfile, UserRepository, UserValidationError,
};
use crate::domain::DomainError;
use crate::infrastructure::observability::{record_cache_access, CacheOutcome};

use super::password::PasswordHasher;

/// How page listings are brought back in line after a write
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ListInvalidation {
    /// Pages are left to expire by TTL
    #[default]
    Ttl,
    /// Page keys populated by this process are evicted on each write
    Tracked,
}

impl fmt::Display for ListInvalidation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Ttl => write!(f, "ttl"),
            Self::Tracked => write!(f, "tracked"),
        }
    }
}

/// Tunables for [`UserService`]
#[derive(Debug, Clone)]
pub struct UserServiceConfig {
    /// Lifetime of every cache entry the service writes
    pub default_ttl: Duration,
    pub list_invalidation: ListInvalidation,
    /// Most page keys remembered for tracked invalidation; older ones are
    /// left to expire by TTL
    pub tracked_pages_capacity: u64,
}

impl Default for UserServiceConfig {
    fn default() -> Self {
        Self {
            default_ttl: Duration::from_secs(60),
            list_invalidation: ListInvalidation::Ttl,
            tracked_pages_capacity: 10_000,
        }
    }
}

impl UserServiceConfig {
    pub fn with_default_ttl(mut self, ttl: Duration) -> Self {
        self.default_ttl = ttl;
        self
    }

    pub fn with_list_invalidation(mut self, mode: ListInvalidation) -> Self {
        self.list_invalidation = mode;
        self
    }

    pub fn with_tracked_pages_capacity(mut self, capacity: u64) -> Self {
        self.tracked_pages_capacity = capacity;
        self
    }
}

/// Request for creating a new user
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct CreateUserRequest {
    pub first_name: String,
    #[serde(default)]
    pub middle_name: Option<String>,
    pub last_name: String,
    pub email: String,
    pub password: String,
    pub phone: String,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl CreateUserRequest {
    /// Trim and lowercase where appropriate, then check every field
    pub fn validated(self) -> Result<Self, UserValidationError> {
        let request = Self {
            first_name: self.first_name.trim().to_string(),
            middle_name: self.middle_name.map(|m| m.trim().to_string()),
            last_name: self.last_name.trim().to_string(),
            email: normalize_email(&self.email),
            phone: self.phone.trim().to_string(),
            ..self
        };

        validate_name("firstName", &request.first_name)?;
        if let Some(middle_name) = &request.middle_name {
            validate_name("middleName", middle_name)?;
        }
        validate_name("lastName", &request.last_name)?;
        validate_email(&request.email)?;
        validate_password(&request.password)?;
        validate_phone(&request.phone)?;

        Ok(request)
    }
}

/// Partial update; absent fields are left untouched
///
/// `middleName` may also be sent as `null`, which clears it.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub middle_name: Option<Option<String>>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub is_active: Option<bool>,
}

impl UpdateUserRequest {
    /// Same rules as [`CreateUserRequest::validated`], applied to the supplied fields only
    pub fn validated(self) -> Result<Self, UserValidationError> {
        let trimmed = |value: Option<String>| value.map(|v| v.trim().to_string());

        let request = Self {
            first_name: trimmed(self.first_name),
            middle_name: self.middle_name.map(trimmed),
            last_name: trimmed(self.last_name),
            email: self.email.as_deref().map(normalize_email),
            phone: trimmed(self.phone),
            ..self
        };

        if let Some(first_name) = &request.first_name {
            validate_name("firstName", first_name)?;
        }
        if let Some(Some(middle_name)) = &request.middle_name {
            validate_name("middleName", middle_name)?;
        }
        if let Some(last_name) = &request.last_name {
            validate_name("lastName", last_name)?;
        }
        if let Some(email) = &request.email {
            validate_email(email)?;
        }
        if let Some(password) = &request.password {
            validate_password(password)?;
        }
        if let Some(phone) = &request.phone {
            validate_phone(phone)?;
        }

        Ok(request)
    }
}

/// Wraps a field that was present in the body, so `null` reads as `Some(None)`
fn present<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

/// User service mediating every read and write between callers, the cache
/// and the store
///
/// Reads are read-through: a cache hit never touches the store, a miss loads
/// from the store and populates the entry with the configured TTL. Writes go
/// to the store first and evict the point entry afterwards. Page listings are
/// not evicted unless [`ListInvalidation::Tracked`] is configured.
///
/// Cache failures never fail an operation: a failed read is served as a
/// miss, a failed write or eviction is logged and counted.
#[derive(Debug)]
pub struct UserService<R: UserRepository + ?Sized, H: PasswordHasher> {
    repository: Arc<R>,
    hasher: Arc<H>,
    cache: Arc<dyn Cache>,
    config: UserServiceConfig,
    /// Page keys written while tracking; entries age out with the pages
    tracked_pages: KeySet<CacheKey, ()>,
}

impl<R: UserRepository + ?Sized, H: PasswordHasher> UserService<R, H> {
    /// Create a new user service
    pub fn new(
        repository: Arc<R>,
        hasher: Arc<H>,
        cache: Arc<dyn Cache>,
        config: UserServiceConfig,
    ) -> Self {
        let tracked_pages = KeySet::builder()
            .max_capacity(config.tracked_pages_capacity)
            .time_to_live(config.default_ttl)
            .build();

        Self {
            repository,
            hasher,
            cache,
            config,
            tracked_pages,
        }
    }

    pub fn config(&self) -> &UserServiceConfig {
        &self.config
    }

    /// List a page of users, served from the page entry when cached
    pub async fn find_all(&self, page: &PageRequest) -> Result<Vec<User>, DomainError> {
        let key = CacheKey::page(page);

        if let Some(users) = self.read_cached::<Vec<User>>(&key, "find_all").await {
            return Ok(users);
        }

        let users = self.repository.find_page(page).await?;
        self.populate(&key, &users, "find_all").await;

        if self.config.list_invalidation == ListInvalidation::Tracked {
            self.tracked_pages.insert(key, ()).await;
        }

        Ok(users)
    }

    /// Get one user, served from the point entry when cached
    pub async fn find_one(&self, id: UserId) -> Result<User, DomainError> {
        let key = CacheKey::user(id);

        if let Some(user) = self.read_cached::<User>(&key, "find_one").await {
            return Ok(user);
        }

        let user = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(id.value()))?;

        self.populate(&key, &user, "find_one").await;

        Ok(user)
    }

    /// Create a user after checking the email is free
    ///
    /// The store's own uniqueness constraint backs up the check; a violation
    /// it reports surfaces as the same `DuplicateKey` error.
    pub async fn create(&self, request: CreateUserRequest) -> Result<User, DomainError> {
        if self.repository.find_by_email(&request.email).await?.is_some() {
            debug!(email = %request.email, "Create rejected, email already in use");
            return Err(DomainError::duplicate_key(request.email));
        }

        let password_hash = self.hasher.hash(&request.password)?;

        let user = self
            .repository
            .insert(NewUser {
                profile: UserProfile {
                    first_name: request.first_name,
                    middle_name: request.middle_name,
                    last_name: request.last_name,
                    email: request.email,
                    phone: request.phone,
                    is_active: request.is_active.unwrap_or(true),
                },
                password_hash,
            })
            .await?;

        info!(user_id = %user.id(), "Created user");

        self.invalidate_pages("create").await;

        Ok(user)
    }

    /// Apply a partial update and evict the point entry
    pub async fn update(
        &self,
        id: UserId,
        request: UpdateUserRequest,
    ) -> Result<User, DomainError> {
        let current = self
            .repository
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found(id.value()))?;

        // Re-submitting the current email is a no-op and skips the check
        let email = request.email.filter(|email| email != current.email());

        if let Some(email) = &email {
            if let Some(holder) = self.repository.find_by_email(email).await? {
                if holder.id() != id {
                    debug!(user_id = %id, email = %email, "Update rejected, email already in use");
                    return Err(DomainError::duplicate_key(email.clone()));
                }
            }
        }

        let password_hash = request
            .password
            .as_deref()
            .map(|password| self.hasher.hash(password))
            .transpose()?;

        let changes = UserChanges {
            first_name: request.first_name,
            middle_name: request.middle_name,
            last_name: request.last_name,
            email,
            phone: request.phone,
            is_active: request.is_active,
            password_hash,
        };

        if changes.is_empty() {
            debug!(user_id = %id, "Update carries no changes");
            return Ok(current);
        }

        let user = self.repository.apply_update(id, &changes).await?;

        info!(user_id = %id, "Updated user");

        self.evict(&CacheKey::user(id), "update").await;
        self.invalidate_pages("update").await;

        Ok(user)
    }

    /// Soft-delete a user and evict the point entry
    ///
    /// Losing a race with a concurrent delete is not an error.
    pub async fn remove(&self, id: UserId) -> Result<(), DomainError> {
        if self.repository.find_by_id(id).await?.is_none() {
            return Err(DomainError::not_found(id.value()));
        }

        let affected = self.repository.soft_delete(id).await?;

        if affected == 0 {
            debug!(user_id = %id, "User already removed concurrently");
        } else {
            info!(user_id = %id, "Removed user");
        }

        self.evict(&CacheKey::user(id), "remove").await;
        self.invalidate_pages("remove").await;

        Ok(())
    }

    /// Probe the store with a one-row page read, bypassing the cache
    pub async fn check_store(&self) -> Result<(), DomainError> {
        let probe = PageRequest::new(0, 1, Default::default())?;
        self.repository.find_page(&probe).await.map(|_| ())
    }

    /// Probe the cache with a read of a point key
    pub async fn check_cache(&self) -> Result<(), DomainError> {
        self.cache.get_raw("user:0").await.map(|_| ())
    }

    async fn read_cached<V>(&self, key: &CacheKey, op: &'static str) -> Option<V>
    where
        V: DeserializeOwned + Send,
    {
        match self.cache.load::<V>(key).await {
            Ok(Some(value)) => {
                debug!(key = %key, "Cache hit");
                record_cache_access(CacheOutcome::Hit, key.kind(), op);
                Some(value)
            }
            Ok(None) => {
                debug!(key = %key, "Cache miss");
                record_cache_access(CacheOutcome::Miss, key.kind(), op);
                None
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Cache read failed, falling back to store");
                record_cache_access(CacheOutcome::Error, key.kind(), op);
                None
            }
        }
    }

    async fn populate<V>(&self, key: &CacheKey, value: &V, op: &'static str)
    where
        V: Serialize + Send + Sync,
    {
        if let Err(e) = self.cache.store(key, value, self.config.default_ttl).await {
            warn!(key = %key, error = %e, "Cache write failed");
            record_cache_access(CacheOutcome::Error, key.kind(), op);
        }
    }

    async fn evict(&self, key: &CacheKey, op: &'static str) {
        match self.cache.evict(key).await {
            Ok(removed) => debug!(key = %key, removed, "Evicted cache entry"),
            Err(e) => {
                warn!(key = %key, error = %e, "Cache eviction failed");
                record_cache_access(CacheOutcome::Error, key.kind(), op);
            }
        }
    }

    async fn invalidate_pages(&self, op: &'static str) {
        if self.config.list_invalidation != ListInvalidation::Tracked {
            return;
        }

        let keys: Vec<Arc<CacheKey>> = self.tracked_pages.iter().map(|(key, _)| key).collect();

        for key in keys {
            self.tracked_pages.invalidate(key.as_ref()).await;
            self.evict(&key, op).await;
        }
    }
}
