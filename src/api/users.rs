//! User record endpoints

use axum::{
    extract::{rejection::QueryRejection, Path, Query, State},
    http::StatusCode,
    routing::get,
    Router,
};
use serde::Deserialize;
use tracing::debug;

use crate::api::state::AppState;
use crate::api::types::{ApiError, Json};
use crate::domain::user::{PageRequest, SortOrder, User, UserId, DEFAULT_PAGE_LIMIT};
use crate::infrastructure::user::{CreateUserRequest, UpdateUserRequest};

/// Query string of `GET /users`
#[derive(Debug, Default, Deserialize)]
pub struct ListUsersQuery {
    pub offset: Option<i64>,
    pub limit: Option<i64>,
    pub order: Option<String>,
}

impl ListUsersQuery {
    fn page(&self) -> Result<PageRequest, ApiError> {
        let order = match &self.order {
            Some(raw) => raw.parse::<SortOrder>()?,
            None => SortOrder::default(),
        };

        Ok(PageRequest::new(
            self.offset.unwrap_or(0),
            self.limit.unwrap_or(i64::from(DEFAULT_PAGE_LIMIT)),
            order,
        )?)
    }
}

pub fn create_users_router() -> Router<AppState> {
    Router::new()
        .route("/users", get(list_users).post(create_user))
        .route(
            "/users/{id}",
            get(get_user).patch(update_user).delete(delete_user),
        )
}

fn parse_id(raw: &str) -> Result<UserId, ApiError> {
    Ok(UserId::parse(raw)?)
}

/// GET /users
pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<ListUsersQuery>, QueryRejection>,
) -> Result<Json<Vec<User>>, ApiError> {
    let Query(query) = query.map_err(|e| ApiError::bad_request(e.body_text()))?;
    let page = query.page()?;

    debug!(
        offset = page.offset(),
        limit = page.limit(),
        order = %page.order(),
        "Listing users"
    );

    let users = state
        .user_service
        .find_all(&page)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(users))
}

/// GET /users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&raw_id)?;
    debug!(user_id = %id, "Getting user");

    let user = state
        .user_service
        .find_one(id)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(user))
}

/// POST /users
pub async fn create_user(
    State(state): State<AppState>,
    Json(request): Json<CreateUserRequest>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let request = request.validated()?;
    debug!(email = %request.email, "Creating user");

    let user = state
        .user_service
        .create(request)
        .await
        .map_err(ApiError::from)?;

    Ok((StatusCode::CREATED, Json(user)))
}

/// PATCH /users/{id}
pub async fn update_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
    Json(request): Json<UpdateUserRequest>,
) -> Result<Json<User>, ApiError> {
    let id = parse_id(&raw_id)?;
    let request = request.validated()?;
    debug!(user_id = %id, "Updating user");

    let user = state
        .user_service
        .update(id, request)
        .await
        .map_err(ApiError::from)?;

    Ok(Json(user))
}

/// DELETE /users/{id}
pub async fn delete_user(
    State(state): State<AppState>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;
    debug!(user_id = %id, "Removing user");

    state
        .user_service
        .remove(id)
        .await
        .map_err(ApiError::from)?;

    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    use crate::api::router::create_router;
    use crate::domain::cache::MockCache;
    use crate::infrastructure::user::{
        InMemoryUserRepository, PlainHasher, UserService, UserServiceConfig,
    };

    fn test_app() -> (Router, Arc<MockCache>) {
        let cache = Arc::new(MockCache::new());
        let service = UserService::new(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(PlainHasher),
            cache.clone(),
            UserServiceConfig::default(),
        );

        (create_router(AppState::new(Arc::new(service))), cache)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        let body = match body {
            Some(json) => {
                builder = builder.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = app
            .clone()
            .oneshot(builder.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };

        (status, value)
    }

    fn ada(email: &str) -> Value {
        json!({
            "firstName": "Ada",
            "lastName": "Lovelace",
            "email": email,
            "password": "analytical",
            "phone": "+44 20 7946 0000"
        })
    }

    #[tokio::test]
    async fn test_create_then_get() {
        let (app, _) = test_app();

        let (status, created) = send(&app, Method::POST, "/users", Some(ada("Ada@X.com"))).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["id"], 1);
        assert_eq!(created["email"], "ada@x.com");
        assert_eq!(created["isActive"], true);
        assert!(created.get("password").is_none());
        assert!(created.get("passwordHash").is_none());
        assert!(created.get("deletedAt").is_none());

        let (status, fetched) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched, created);

        let (_, cached) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(cached, created);
    }

    #[tokio::test]
    async fn test_create_duplicate_is_conflict() {
        let (app, _) = test_app();
        send(&app, Method::POST, "/users", Some(ada("a@x.com"))).await;

        let (status, body) = send(&app, Method::POST, "/users", Some(ada("a@x.com"))).await;

        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"]["type"], "conflict_error");
        assert_eq!(body["error"]["param"], "email");
    }

    #[tokio::test]
    async fn test_create_rejects_bad_input() {
        let (app, _) = test_app();

        let mut short = ada("a@x.com");
        short["password"] = json!("12345");
        let (status, body) = send(&app, Method::POST, "/users", Some(short)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["param"], "password");

        let mut unknown = ada("a@x.com");
        unknown["role"] = json!("admin");
        let (status, _) = send(&app, Method::POST, "/users", Some(unknown)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let missing = json!({"firstName": "Ada"});
        let (status, _) = send(&app, Method::POST, "/users", Some(missing)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_get_invalid_and_missing_ids() {
        let (app, _) = test_app();

        let (status, body) = send(&app, Method::GET, "/users/abc", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["param"], "id");

        let (status, _) = send(&app, Method::GET, "/users/0", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, body) = send(&app, Method::GET, "/users/42", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["type"], "not_found_error");
    }

    #[tokio::test]
    async fn test_update_reflects_immediately() {
        let (app, _) = test_app();
        send(&app, Method::POST, "/users", Some(ada("a@x.com"))).await;
        send(&app, Method::GET, "/users/1", None).await;

        let (status, updated) = send(
            &app,
            Method::PATCH,
            "/users/1",
            Some(json!({"firstName": "A"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated["firstName"], "A");

        let (_, fetched) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(fetched["firstName"], "A");
        assert_eq!(fetched["lastName"], "Lovelace");
    }

    #[tokio::test]
    async fn test_update_email_conflict_scenario() {
        let (app, _) = test_app();
        send(&app, Method::POST, "/users", Some(ada("a@x.com"))).await;
        send(&app, Method::POST, "/users", Some(ada("b@x.com"))).await;

        let (status, _) = send(
            &app,
            Method::PATCH,
            "/users/2",
            Some(json!({"email": "a@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::CONFLICT);

        let (status, body) = send(
            &app,
            Method::PATCH,
            "/users/2",
            Some(json!({"email": "b@x.com"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["email"], "b@x.com");
    }

    #[tokio::test]
    async fn test_delete_then_get_is_not_found() {
        let (app, cache) = test_app();
        send(&app, Method::POST, "/users", Some(ada("a@x.com"))).await;
        send(&app, Method::GET, "/users/1", None).await;
        assert!(cache.contains("user:1"));

        let (status, body) = send(&app, Method::DELETE, "/users/1", None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        assert_eq!(body, Value::Null);
        assert!(!cache.contains("user:1"));

        let (status, _) = send(&app, Method::GET, "/users/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, _) = send(&app, Method::DELETE, "/users/1", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_pagination_and_order() {
        let (app, cache) = test_app();
        for email in ["a@x.com", "b@x.com", "c@x.com"] {
            send(&app, Method::POST, "/users", Some(ada(email))).await;
        }

        let (status, asc) = send(&app, Method::GET, "/users", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(asc.as_array().unwrap().len(), 3);
        assert_eq!(asc[0]["id"], 1);
        assert!(cache.contains("users:page:0:20:asc"));

        let (_, desc) = send(&app, Method::GET, "/users?offset=1&limit=1&order=DESC", None).await;
        assert_eq!(desc.as_array().unwrap().len(), 1);
        assert_eq!(desc[0]["id"], 2);
        assert!(cache.contains("users:page:1:1:desc"));
    }

    #[tokio::test]
    async fn test_list_rejects_bad_pagination() {
        let (app, _) = test_app();

        for uri in [
            "/users?offset=-1",
            "/users?limit=0",
            "/users?limit=101",
            "/users?order=sideways",
            "/users?limit=ten",
        ] {
            let (status, body) = send(&app, Method::GET, uri, None).await;
            assert_eq!(status, StatusCode::BAD_REQUEST, "{}", uri);
            assert_eq!(body["error"]["type"], "invalid_request_error");
        }
    }

    #[test]
    fn test_list_query_defaults() {
        let page = ListUsersQuery::default().page().unwrap();

        assert_eq!(page.offset(), 0);
        assert_eq!(page.limit(), DEFAULT_PAGE_LIMIT);
        assert_eq!(page.order(), SortOrder::Asc);
    }
}
