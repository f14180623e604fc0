//! Pagination parameters for user listings

use serde::{Deserialize, Serialize};

use super::validation::UserValidationError;

pub const DEFAULT_PAGE_LIMIT: u32 = 20;
pub const MAX_PAGE_LIMIT: u32 = 100;

/// Ordering of a listing by user id
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Asc => "asc",
            Self::Desc => "desc",
        }
    }
}

impl std::fmt::Display for SortOrder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SortOrder {
    type Err = UserValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(UserValidationError::InvalidSortOrder(s.to_string())),
        }
    }
}

/// A validated (offset, limit, order) triple
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PageRequest {
    offset: u64,
    limit: u32,
    order: SortOrder,
}

impl PageRequest {
    /// Validate raw pagination input
    ///
    /// Rules:
    /// - offset >= 0
    /// - 1 <= limit <= 100
    pub fn new(offset: i64, limit: i64, order: SortOrder) -> Result<Self, UserValidationError> {
        if offset < 0 {
            return Err(UserValidationError::InvalidOffset(offset));
        }

        if limit < 1 || limit > i64::from(MAX_PAGE_LIMIT) {
            return Err(UserValidationError::InvalidLimit(limit, MAX_PAGE_LIMIT));
        }

        Ok(Self {
            offset: offset as u64,
            limit: limit as u32,
            order,
        })
    }

    pub fn offset(&self) -> u64 {
        self.offset
    }

    pub fn limit(&self) -> u32 {
        self.limit
    }

    pub fn order(&self) -> SortOrder {
        self.order
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            offset: 0,
            limit: DEFAULT_PAGE_LIMIT,
            order: SortOrder::Asc,
        }
    }
}
