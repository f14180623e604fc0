//! Cache key scheme for user lookups

use std::fmt;

use crate::domain::user::{PageRequest, UserId};

/// Addressable cache entries
///
/// Point lookups render as `user:<id>` and page listings as
/// `users:page:<offset>:<limit>:<order>`; each distinct pagination triple is
/// an independent entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheKey {
    User(UserId),
    Page(PageRequest),
}

impl CacheKey {
    pub fn user(id: UserId) -> Self {
        Self::User(id)
    }

    pub fn page(page: &PageRequest) -> Self {
        Self::Page(*page)
    }

    /// Metric label for the kind of entry
    pub fn kind(&self) -> &'static str {
        match self {
            Self::User(_) => "point",
            Self::Page(_) => "page",
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User(id) => write!(f, "user:{}", id),
            Self::Page(page) => write!(
                f,
                "users:page:{}:{}:{}",
                page.offset(),
                page.limit(),
                page.order()
            ),
        }
    }
}
