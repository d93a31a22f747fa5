//! Request handlers and error-to-status mapping.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::{debug, error};

use crate::db::{Database, now};
use crate::error::StoreError;
use crate::types::{Health, Task, TaskPatch};

/// Store error wrapped for the HTTP boundary.
///
/// This is the single place the typed store taxonomy turns into status
/// codes and `{"error": ...}` bodies. Internal failures are logged in
/// full but answered with a generic message; SQL details and connection
/// strings never reach a response body.
pub(super) struct ApiError(StoreError);

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match &self.0 {
            StoreError::Validation(msg) => (StatusCode::BAD_REQUEST, msg.clone()),
            StoreError::NotFound => (StatusCode::NOT_FOUND, self.0.to_string()),
            StoreError::Connection(_) | StoreError::Store(_) => {
                error!("store error: {}", self.0);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "Error del servidor".to_string(),
                )
            }
        };

        (status, Json(json!({ "error": message }))).into_response()
    }
}

/// `GET /tasks` — the full list, newest first.
pub(super) async fn list_tasks(
    State(db): State<Database>,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tasks = db.list_tasks()?;
    debug!("listed {} tasks", tasks.len());
    Ok(Json(tasks))
}

/// `GET /tasks/{id}`.
pub(super) async fn get_task(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<Json<Task>, ApiError> {
    let task = db.get_task(id)?.ok_or(StoreError::NotFound)?;
    Ok(Json(task))
}

#[derive(Debug, Deserialize)]
pub(super) struct CreateTask {
    // A missing title falls through to store validation as blank.
    #[serde(default)]
    title: String,
}

/// `POST /tasks` — 201 with the row as persisted.
pub(super) async fn create_task(
    State(db): State<Database>,
    Json(body): Json<CreateTask>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let task = db.create_task(&body.title)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// `PUT /tasks/{id}` — partial update, 404 when the id is unknown.
pub(super) async fn update_task(
    State(db): State<Database>,
    Path(id): Path<i64>,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let task = db.update_task(id, &patch)?;
    Ok(Json(task))
}

#[derive(Debug, Serialize)]
pub(super) struct DeleteResponse {
    message: String,
    #[serde(rename = "deletedTask")]
    deleted_task: Task,
}

/// `DELETE /tasks/{id}` — confirmation includes the deleted row's prior
/// state.
pub(super) async fn delete_task(
    State(db): State<Database>,
    Path(id): Path<i64>,
) -> Result<Json<DeleteResponse>, ApiError> {
    let deleted = db.delete_task(id)?;
    Ok(Json(DeleteResponse {
        message: "Tarea eliminada correctamente".to_string(),
        deleted_task: deleted,
    }))
}

/// `GET /health` — always resolves to one of the two documented shapes,
/// never an uncaught error.
pub(super) async fn health(State(db): State<Database>) -> Response {
    match db.ping() {
        Ok(()) => (
            StatusCode::OK,
            Json(Health {
                status: "healthy".into(),
                database: "connected".into(),
                timestamp: Some(now()),
                error: None,
            }),
        )
            .into_response(),
        Err(e) => {
            error!("health check failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(Health {
                    status: "unhealthy".into(),
                    database: "disconnected".into(),
                    timestamp: None,
                    error: Some("No se pudo consultar la base de datos".into()),
                }),
            )
                .into_response()
        }
    }
}
