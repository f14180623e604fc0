//! JSON body extractor reporting failures in the API error envelope

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{de::DeserializeOwned, Serialize};

use super::error::{ApiError, ApiErrorType};

static FIELD_IN_ERROR: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?:unknown|missing) field `([^`]+)`").expect("field pattern is valid")
});

/// `axum::Json` with [`ApiError`] rejections
///
/// Data errors are 400 rather than axum's 422, and name the offending field
/// in `param` when serde reports one.
#[derive(Debug, Clone, Copy, Default)]
pub struct Json<T>(pub T);

impl<S, T> FromRequest<S> for Json<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        axum::Json::<T>::from_request(req, state)
            .await
            .map(|axum::Json(value)| Json(value))
            .map_err(rejection_to_error)
    }
}

impl<T: Serialize> IntoResponse for Json<T> {
    fn into_response(self) -> Response {
        axum::Json(self.0).into_response()
    }
}

fn rejection_to_error(rejection: JsonRejection) -> ApiError {
    match rejection {
        JsonRejection::MissingJsonContentType(_) => ApiError::new(
            StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiErrorType::InvalidRequestError,
            "Expected 'Content-Type: application/json'",
        )
        .with_code("unsupported_media_type"),
        JsonRejection::JsonDataError(err) => {
            let detail = err.body_text();
            let error = ApiError::bad_request(format!("Invalid request body: {}", detail))
                .with_code("invalid_body");

            match offending_field(&detail) {
                Some(field) => error.with_param(field),
                None => error,
            }
        }
        JsonRejection::JsonSyntaxError(err) => {
            ApiError::bad_request(format!("Malformed JSON: {}", err.body_text()))
                .with_code("malformed_json")
        }
        other => ApiError::bad_request(format!("Unreadable request body: {}", other.body_text())),
    }
}

fn offending_field(detail: &str) -> Option<&str> {
    FIELD_IN_ERROR
        .captures(detail)
        .and_then(|captures| captures.get(1))
        .map(|m| m.as_str())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;

    #[derive(Debug, Deserialize)]
    #[serde(deny_unknown_fields, rename_all = "camelCase")]
    struct Signup {
        first_name: String,
    }

    async fn extract(content_type: Option<&str>, body: &'static str) -> Result<Signup, ApiError> {
        let mut builder = axum::http::Request::builder().method("POST").uri("/users");
        if let Some(content_type) = content_type {
            builder = builder.header("content-type", content_type);
        }
        let request = builder.body(axum::body::Body::from(body)).unwrap();

        Json::<Signup>::from_request(request, &()).await.map(|Json(v)| v)
    }

    #[tokio::test]
    async fn test_valid_body_extracts() {
        let signup = extract(Some("application/json"), r#"{"firstName":"Ada"}"#)
            .await
            .unwrap();
        assert_eq!(signup.first_name, "Ada");
    }

    #[tokio::test]
    async fn test_unknown_field_names_param() {
        let error = extract(Some("application/json"), r#"{"firstName":"Ada","role":"admin"}"#)
            .await
            .unwrap_err();

        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.response.error.param.as_deref(), Some("role"));
        assert_eq!(error.response.error.code.as_deref(), Some("invalid_body"));
    }

    #[tokio::test]
    async fn test_missing_field_names_param() {
        let error = extract(Some("application/json"), "{}").await.unwrap_err();

        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.response.error.param.as_deref(), Some("firstName"));
    }

    #[tokio::test]
    async fn test_syntax_error_is_bad_request() {
        let error = extract(Some("application/json"), "{not json").await.unwrap_err();

        assert_eq!(error.status, StatusCode::BAD_REQUEST);
        assert_eq!(error.response.error.code.as_deref(), Some("malformed_json"));
    }

    #[tokio::test]
    async fn test_missing_content_type() {
        let error = extract(None, r#"{"firstName":"Ada"}"#).await.unwrap_err();
        assert_eq!(error.status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
    }

    #[test]
    fn test_offending_field() {
        assert_eq!(
            offending_field("unknown field `role`, expected one of `firstName`"),
            Some("role")
        );
        assert_eq!(offending_field("invalid type: integer"), None);
    }
}
