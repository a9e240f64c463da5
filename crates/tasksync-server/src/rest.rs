//! Task CRUD endpoints.
//!
//! Every successful mutation here commits to the store, which publishes
//! the matching feed event; that is what connected sync clients observe.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use tasksync_core::{NewTask, Task, TaskPatch};
use tasksync_store::StoreError;
use tracing::warn;

use crate::server::AppState;

/// Failure answering a REST request.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// The named task does not exist.
    #[error("task not found: {0}")]
    TaskNotFound(String),

    /// The request is missing or malforms a required parameter.
    #[error("{0}")]
    BadRequest(String),

    /// The store failed underneath the handler.
    #[error(transparent)]
    Store(#[from] StoreError),
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::TaskNotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Store(err) => {
                warn!(%err, "store error answering REST request");
                StatusCode::INTERNAL_SERVER_ERROR
            }
        };
        let body = ErrorResponse {
            error: self.to_string(),
        };
        (status, Json(body)).into_response()
    }
}

/// Query string carrying the owner identity.
#[derive(Deserialize)]
pub struct OwnerQuery {
    /// Owner whose tasks to list.
    #[serde(rename = "userEmail")]
    pub user_email: Option<String>,
}

impl OwnerQuery {
    fn require(self) -> Result<String, ApiError> {
        match self.user_email {
            Some(email) if !email.trim().is_empty() => Ok(email),
            _ => Err(ApiError::BadRequest("userEmail is required".into())),
        }
    }
}

/// Body of a successful `DELETE /tasks/{id}`.
#[derive(Serialize)]
pub struct DeleteResponse {
    /// Always true; a missing task is a 404 instead.
    pub deleted: bool,
}

/// `POST /tasks`
pub async fn create_task(
    State(state): State<AppState>,
    Json(new): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    if new.user_email.trim().is_empty() {
        return Err(ApiError::BadRequest("userEmail is required".into()));
    }
    let task = state.store.create(&new)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `GET /tasks?userEmail=...`
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let owner = query.require()?;
    Ok(Json(state.store.find_by_owner(&owner)?))
}

/// `GET /tasks/category/{category}?userEmail=...`
pub async fn list_tasks_by_category(
    State(state): State<AppState>,
    Path(category): Path<String>,
    Query(query): Query<OwnerQuery>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let owner = query.require()?;
    Ok(Json(
        state.store.find_by_owner_and_category(&owner, &category)?,
    ))
}

/// `PUT /tasks/{id}`
pub async fn update_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    match state.store.update(&id, &patch)? {
        Some(task) => Ok(Json(task)),
        None => Err(ApiError::TaskNotFound(id)),
    }
}

/// `DELETE /tasks/{id}`
pub async fn delete_task(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<DeleteResponse>, ApiError> {
    if state.store.delete(&id)? {
        Ok(Json(DeleteResponse { deleted: true }))
    } else {
        Err(ApiError::TaskNotFound(id))
    }
}
