//! User CRUD handlers.
//!
//! Thin translation layer: decode, validate, call `UserService`, and map
//! `StoreError` onto the HTTP error taxonomy.

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    Json,
};
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

use crate::http::error::ApiError;
use crate::http::response::ApiResponse;
use crate::http::server::AppState;
use crate::users::{CreateUserRequest, Page, StoreError, UpdateUserRequest, User};

type HandlerResult<T> = Result<ApiResponse<T>, ApiError>;

/// Raw pagination parameters. The first occurrence of a key wins and
/// unparseable values are treated as absent.
#[derive(Debug, Default)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
}

impl ListParams {
    pub fn from_pairs(pairs: Vec<(String, String)>) -> Self {
        let mut params = Self::default();
        for (key, value) in pairs {
            let slot = match key.as_str() {
                "limit" => &mut params.limit,
                "offset" => &mut params.offset,
                _ => continue,
            };
            slot.get_or_insert(value);
        }
        params
    }

    /// A query string that cannot be decoded at all falls back to the defaults.
    fn from_query(query: Result<Query<Vec<(String, String)>>, QueryRejection>) -> Self {
        match query {
            Ok(Query(pairs)) => Self::from_pairs(pairs),
            Err(rejection) => {
                tracing::debug!(error = %rejection.body_text(), "Ignoring undecodable query");
                Self::default()
            }
        }
    }

    fn page(&self) -> Page {
        let parse = |v: &Option<String>| v.as_deref().and_then(|s| s.trim().parse().ok());
        Page::clamped(parse(&self.limit), parse(&self.offset))
    }
}

#[derive(Debug, Serialize)]
pub struct UserList {
    pub users: Vec<User>,
    pub limit: i64,
    pub offset: i64,
    pub count: usize,
}

fn parse_id(raw: Result<Path<String>, PathRejection>) -> Result<Uuid, ApiError> {
    let Path(raw) = raw.map_err(|e| ApiError::bad_request("Invalid user ID", e.body_text()))?;
    Uuid::parse_str(&raw).map_err(|e| ApiError::bad_request("Invalid user ID", e))
}

fn invalid_body(rejection: JsonRejection) -> ApiError {
    ApiError::bad_request("Invalid request body", rejection.body_text())
}

fn store_error(failure: &str, err: StoreError) -> ApiError {
    match err {
        StoreError::NotFound => ApiError::NotFound("User not found".to_string()),
        StoreError::Conflict(detail) => ApiError::Conflict {
            message: failure.to_string(),
            detail,
        },
        StoreError::Database(e) => {
            tracing::error!(error = %e, operation = failure, "Store operation failed");
            ApiError::Dependency(failure.to_string())
        }
    }
}

pub async fn create_user(
    State(state): State<AppState>,
    body: Result<Json<CreateUserRequest>, JsonRejection>,
) -> HandlerResult<User> {
    let Json(req) = body.map_err(invalid_body)?;
    req.validate().map_err(ApiError::Validation)?;

    let user = state
        .users
        .create(&req)
        .await
        .map_err(|e| store_error("Failed to create user", e))?;

    tracing::info!(user_id = %user.id, "User created");
    Ok(ApiResponse::created("User created successfully", user))
}

pub async fn get_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> HandlerResult<User> {
    let id = parse_id(id)?;
    let user = state
        .users
        .get(id)
        .await
        .map_err(|e| store_error("Failed to get user", e))?;
    Ok(ApiResponse::ok("User retrieved successfully", user))
}

pub async fn list_users(
    State(state): State<AppState>,
    query: Result<Query<Vec<(String, String)>>, QueryRejection>,
) -> HandlerResult<UserList> {
    let page = ListParams::from_query(query).page();
    let users = state
        .users
        .list(page)
        .await
        .map_err(|e| store_error("Failed to list users", e))?;

    Ok(ApiResponse::ok(
        "Users retrieved successfully",
        UserList {
            count: users.len(),
            users,
            limit: page.limit,
            offset: page.offset,
        },
    ))
}

pub async fn update_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
    body: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> HandlerResult<User> {
    let id = parse_id(id)?;
    let Json(req) = body.map_err(invalid_body)?;
    req.validate().map_err(ApiError::Validation)?;

    let user = state
        .users
        .update(id, &req)
        .await
        .map_err(|e| store_error("Failed to update user", e))?;
    Ok(ApiResponse::ok("User updated successfully", user))
}

pub async fn delete_user(
    State(state): State<AppState>,
    id: Result<Path<String>, PathRejection>,
) -> HandlerResult<Value> {
    let id = parse_id(id)?;
    state
        .users
        .delete(id)
        .await
        .map_err(|e| store_error("Failed to delete user", e))?;

    tracing::info!(user_id = %id, "User deleted");
    Ok(ApiResponse::empty("User deleted successfully"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(limit: Option<&str>, offset: Option<&str>) -> ListParams {
        ListParams {
            limit: limit.map(str::to_string),
            offset: offset.map(str::to_string),
        }
    }

    #[test]
    fn unparseable_pagination_uses_defaults() {
        assert_eq!(params(None, None).page(), Page { limit: 10, offset: 0 });
        assert_eq!(params(Some("abc"), Some("-")).page(), Page { limit: 10, offset: 0 });
        assert_eq!(params(Some("0"), Some("-4")).page(), Page { limit: 10, offset: 0 });
        assert_eq!(params(Some("5"), Some("20")).page(), Page { limit: 5, offset: 20 });
    }

    #[test]
    fn repeated_keys_keep_the_first_value() {
        let pairs = vec![
            ("limit".to_string(), "5".to_string()),
            ("limit".to_string(), "6".to_string()),
            ("sort".to_string(), "name".to_string()),
            ("offset".to_string(), "x".to_string()),
            ("offset".to_string(), "3".to_string()),
        ];
        let params = ListParams::from_pairs(pairs);
        assert_eq!(params.limit.as_deref(), Some("5"));
        assert_eq!(params.page(), Page { limit: 5, offset: 0 });
    }

    #[test]
    fn store_errors_map_to_taxonomy() {
        assert!(matches!(
            store_error("Failed to get user", StoreError::NotFound),
            ApiError::NotFound(ref m) if m == "User not found"
        ));
        assert!(matches!(
            store_error("Failed to create user", StoreError::Conflict("taken".into())),
            ApiError::Conflict { ref message, .. } if message == "Failed to create user"
        ));
        assert!(matches!(
            store_error("Failed to list users", StoreError::Database(sqlx::Error::PoolTimedOut)),
            ApiError::Dependency(_)
        ));
    }
}
