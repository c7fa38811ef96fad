//! Task submission and status handlers.

use super::{SubmitTaskRequest, SubmitTaskResponse};
use crate::api::AppState;
use crate::api::auth::presented_token;
use crate::error::Result;
use crate::types::{TaskId, TaskRecord};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

/// POST /tasks - Submit a task
///
/// The required permission follows `task_type`: `get_video`, `get_audio`,
/// `get_info`, `get_live_video` or `get_live_audio`.
#[utoipa::path(
    post,
    path = "/tasks",
    tag = "tasks",
    request_body(content = crate::types::TaskRequest, description = "Task fields tagged by `task_type`, plus an optional `proxy`"),
    responses(
        (status = 201, description = "Task queued", body = SubmitTaskResponse),
        (status = 400, description = "Malformed request", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 403, description = "Key lacks the task type's permission", body = crate::error::ApiError),
        (status = 429, description = "Request or memory quota exhausted", body = crate::error::ApiError),
        (status = 503, description = "Shutting down", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn submit_task(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<SubmitTaskRequest>,
) -> Result<impl IntoResponse> {
    let record = state
        .scheduler
        .submit_task(presented_token(&headers), body.request, body.proxy)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitTaskResponse {
            task_id: record.id,
            status: record.status,
        }),
    ))
}

/// GET /tasks/:id - Task status
#[utoipa::path(
    get,
    path = "/tasks/{id}",
    tag = "tasks",
    params(
        ("id" = TaskId, Path, description = "Task id")
    ),
    responses(
        (status = 200, description = "Task record", body = TaskRecord),
        (status = 404, description = "Task not found", body = crate::error::ApiError)
    )
)]
pub async fn get_task(
    State(state): State<AppState>,
    Path(id): Path<TaskId>,
) -> Result<Json<TaskRecord>> {
    Ok(Json(state.scheduler.get_task(id).await?))
}
