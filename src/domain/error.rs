use thiserror::Error;

/// Collaborator whose failure produced a [`DomainError::DependencyUnavailable`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dependency {
    Store,
    Cache,
}

impl std::fmt::Display for Dependency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Store => write!(f, "store"),
            Self::Cache => write!(f, "cache"),
        }
    }
}

/// Core domain errors
#[derive(Debug, Error)]
pub enum DomainError {
    #[error("User '{id}' not found")]
    RecordNotFound { id: i64 },

    #[error("Email '{email}' is already in use")]
    DuplicateKey { email: String },

    #[error("Invalid input: {message}")]
    InvalidInput { message: String },

    #[error("{dependency} unavailable: {message}")]
    DependencyUnavailable {
        dependency: Dependency,
        message: String,
    },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },
}

impl DomainError {
    pub fn not_found(id: i64) -> Self {
        Self::RecordNotFound { id }
    }

    pub fn duplicate_key(email: impl Into<String>) -> Self {
        Self::DuplicateKey {
            email: email.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::InvalidInput {
            message: message.into(),
        }
    }

    pub fn storage(message: impl Into<String>) -> Self {
        Self::DependencyUnavailable {
            dependency: Dependency::Store,
            message: message.into(),
        }
    }

    pub fn cache(message: impl Into<String>) -> Self {
        Self::DependencyUnavailable {
            dependency: Dependency::Cache,
            message: message.into(),
        }
    }

    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// True when a store or cache call failed rather than the request itself
    pub fn is_dependency_unavailable(&self) -> bool {
        matches!(self, Self::DependencyUnavailable { .. })
    }
}
