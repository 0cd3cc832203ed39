use std::future::Future;
use std::time::Duration;

use axum::extract::{Extension, Path, Query, State};
use serde::Deserialize;
use serde_json::{json, Value};

use crate::auth::Principal;
use crate::config::config;
use crate::error::ApiError;
use crate::middleware::response::{ApiResponse, ApiResult};
use crate::state::AppState;
use crate::store::{StoreError, TodoItem, TodoPatch};

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    /// Page-size cap; clamped to the configured maximum.
    pub limit: Option<usize>,
}

/// GET /todos - list the caller's items
pub async fn list(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Query(query): Query<ListQuery>,
) -> ApiResult<Vec<TodoItem>> {
    let cap = config().store.list_max_items;
    let limit = query.limit.map(|l| l.min(cap)).unwrap_or(cap);

    let todos = bounded(state.store.list(&principal.owner_id, limit)).await?;
    Ok(ApiResponse::success(todos))
}

/// POST /todos - create a new item for the caller
pub async fn create(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    body: String,
) -> ApiResult<TodoItem> {
    let (title, content) = parse_create_body(&body)?;

    let todo = bounded(state.store.create(&principal.owner_id, title, content)).await?;
    Ok(ApiResponse::created(todo))
}

/// GET /todos/:id - fetch one of the caller's items
pub async fn get(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<TodoItem> {
    let todo = bounded(state.store.get(&principal.owner_id, &id)).await?;
    Ok(ApiResponse::success(todo))
}

/// PUT /todos/:id - partially update one of the caller's items
pub async fn update(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
    body: String,
) -> ApiResult<TodoItem> {
    let patch = parse_update_body(&body)?;

    let todo = bounded(state.store.update(&principal.owner_id, &id, patch)).await?;
    Ok(ApiResponse::success(todo))
}

/// DELETE /todos/:id - remove one of the caller's items
pub async fn delete(
    State(state): State<AppState>,
    Extension(principal): Extension<Principal>,
    Path(id): Path<String>,
) -> ApiResult<Value> {
    bounded(state.store.delete(&principal.owner_id, &id)).await?;
    Ok(ApiResponse::success(json!({ "message": "deleted" })))
}

/// Fallback for unmatched routes; runs before auth by construction.
pub async fn not_found() -> ApiError {
    ApiError::not_found("route not found")
}

/// Bound a store call by the configured timeout. A slow store surfaces as
/// 503, never a hung caller.
async fn bounded<T>(
    op: impl Future<Output = Result<T, StoreError>>,
) -> Result<T, ApiError> {
    let timeout = Duration::from_millis(config().store.op_timeout_ms);
    match tokio::time::timeout(timeout, op).await {
        Ok(result) => result.map_err(ApiError::from),
        Err(_) => {
            tracing::error!("store operation timed out after {:?}", timeout);
            Err(ApiError::service_unavailable("store operation timed out"))
        }
    }
}

#[derive(Debug, Deserialize)]
struct CreateBody {
    title: String,
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct UpdateBody {
    title: Option<String>,
    content: Option<String>,
    done: Option<bool>,
}

fn parse_create_body(body: &str) -> Result<(String, String), ApiError> {
    let parsed: CreateBody = serde_json::from_str(body)
        .map_err(|_| ApiError::invalid_json("invalid request body"))?;

    if parsed.title.trim().is_empty() {
        return Err(ApiError::bad_request("title is required"));
    }
    Ok((parsed.title, parsed.content))
}

fn parse_update_body(body: &str) -> Result<TodoPatch, ApiError> {
    let parsed: UpdateBody = serde_json::from_str(body)
        .map_err(|_| ApiError::invalid_json("invalid request body"))?;

    if let Some(title) = &parsed.title {
        if title.trim().is_empty() {
            return Err(ApiError::bad_request("title must not be empty"));
        }
    }

    Ok(TodoPatch {
        title: parsed.title,
        content: parsed.content,
        done: parsed.done,
    })
}
