//! HTTP routes for `/api/todos`.
//!
//! Handlers are stateless: they validate the request, hand one call to the
//! shared [`Store`] on the blocking pool, and shape the result.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Path, State},
    http::{header, HeaderMap, StatusCode},
    routing::get,
    Json, Router,
};
use tracing::debug;

use crate::error::ApiError;
use crate::store::{Store, StoreResult, Todo};
use crate::validation::{parse_body, parse_id, NewTodo, TodoPatch};

pub fn app(store: Arc<Store>) -> Router {
    Router::new()
        .route("/api/todos", get(list_todos).post(create_todo))
        .route(
            "/api/todos/{id}",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
        .with_state(store)
}

/// Runs a store operation off the async executor.
async fn with_store<T, F>(store: &Arc<Store>, op: F) -> Result<T, ApiError>
where
    F: FnOnce(&Store) -> StoreResult<T> + Send + 'static,
    T: Send + 'static,
{
    let store = Arc::clone(store);
    let result = tokio::task::spawn_blocking(move || op(&store))
        .await
        .map_err(|err| ApiError::Internal(err.to_string()))?;
    Ok(result?)
}

fn content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
}

async fn list_todos(State(store): State<Arc<Store>>) -> Result<Json<Vec<Todo>>, ApiError> {
    let todos = with_store(&store, Store::list_all).await?;
    Ok(Json(todos))
}

async fn create_todo(
    State(store): State<Arc<Store>>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    let input = NewTodo::from_fields(&parse_body(content_type(&headers), &body)?)?;
    let todo = with_store(&store, move |store| {
        store.create(&input.title, input.completed)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(todo)))
}

async fn get_todo(
    State(store): State<Arc<Store>>,
    Path(raw_id): Path<String>,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&raw_id)?;
    match with_store(&store, move |store| store.get(id)).await? {
        Some(todo) => Ok(Json(todo)),
        None => {
            debug!(id, "todo not found");
            Err(ApiError::NotFound)
        }
    }
}

async fn update_todo(
    State(store): State<Arc<Store>>,
    Path(raw_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Json<Todo>, ApiError> {
    let id = parse_id(&raw_id)?;
    let patch = TodoPatch::from_fields(&parse_body(content_type(&headers), &body)?)?;
    let updated = with_store(&store, move |store| {
        store.update(id, patch.title.as_deref(), patch.completed)
    })
    .await?;
    match updated {
        Some(todo) => Ok(Json(todo)),
        None => {
            debug!(id, "todo not found for update");
            Err(ApiError::NotFound)
        }
    }
}

async fn delete_todo(
    State(store): State<Arc<Store>>,
    Path(raw_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    let id = parse_id(&raw_id)?;
    if with_store(&store, move |store| store.delete(id)).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        debug!(id, "todo not found for delete");
        Err(ApiError::NotFound)
    }
}
