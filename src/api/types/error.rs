//! Error envelope: `{"error": {"message", "type", "param", "code"}}`

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{DomainError, UserValidationError};

/// Error category reported in `error.type`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApiErrorType {
    InvalidRequestError,
    NotFoundError,
    ConflictError,
    ServerError,
    ServiceUnavailableError,
}

impl ApiErrorType {
    /// Status a category is served with unless overridden
    pub fn status(self) -> StatusCode {
        match self {
            Self::InvalidRequestError => StatusCode::BAD_REQUEST,
            Self::NotFoundError => StatusCode::NOT_FOUND,
            Self::ConflictError => StatusCode::CONFLICT,
            Self::ServerError => StatusCode::INTERNAL_SERVER_ERROR,
            Self::ServiceUnavailableError => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiErrorDetail {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: ApiErrorType,
    /// Offending request field
    #[serde(skip_serializing_if = "Option::is_none")]
    pub param: Option<String>,
    /// Machine-readable reason
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
}

/// An error response ready to send
#[derive(Debug, Error)]
#[error("{status}: {}", .response.error.message)]
pub struct ApiError {
    pub status: StatusCode,
    pub response: ApiErrorResponse,
}

impl ApiError {
    pub fn new(status: StatusCode, error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self {
            status,
            response: ApiErrorResponse {
                error: ApiErrorDetail {
                    message: message.into(),
                    error_type,
                    param: None,
                    code: None,
                },
            },
        }
    }

    fn of(error_type: ApiErrorType, message: impl Into<String>) -> Self {
        Self::new(error_type.status(), error_type, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::of(ApiErrorType::InvalidRequestError, message)
    }

    pub fn with_param(mut self, param: impl Into<String>) -> Self {
        self.response.error.param = Some(param.into());
        self
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.response.error.code = Some(code.into());
        self
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status, axum::Json(self.response)).into_response()
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match &err {
            DomainError::RecordNotFound { .. } => {
                Self::of(ApiErrorType::NotFoundError, err.to_string()).with_code("record_not_found")
            }
            DomainError::DuplicateKey { .. } => {
                Self::of(ApiErrorType::ConflictError, err.to_string())
                    .with_param("email")
                    .with_code("duplicate_key")
            }
            DomainError::InvalidInput { .. } => Self::bad_request(err.to_string()),
            DomainError::DependencyUnavailable { dependency, .. } => {
                tracing::error!(error = %err, "Request failed on unavailable dependency");
                Self::of(
                    ApiErrorType::ServiceUnavailableError,
                    format!("{} is temporarily unavailable", dependency),
                )
                .with_code("dependency_unavailable")
            }
            DomainError::Configuration { .. } | DomainError::Internal { .. } => {
                tracing::error!(error = %err, "Request failed on internal error");
                Self::of(ApiErrorType::ServerError, "Internal server error")
            }
        }
    }
}

impl From<UserValidationError> for ApiError {
    fn from(err: UserValidationError) -> Self {
        Self::bad_request(err.to_string()).with_param(err.field())
    }
}
