//! Artifact download handler.

use crate::api::AppState;
use crate::error::{ApiError, Error, Result};
use crate::types::{TaskId, TaskStatus};
use crate::utils::{is_plain_file_name, task_dir};
use axum::{
    Json,
    body::Body,
    extract::{Path, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
};
use tokio_util::io::ReaderStream;

/// GET /files/:id/:file - Download a task artifact
///
/// Serves files of completed tasks only; `file` must be a plain file name.
#[utoipa::path(
    get,
    path = "/files/{id}/{file}",
    tag = "files",
    params(
        ("id" = TaskId, Path, description = "Task id"),
        ("file" = String, Path, description = "File name inside the task directory")
    ),
    responses(
        (status = 200, description = "File contents", content_type = "application/octet-stream"),
        (status = 400, description = "Invalid file name", body = crate::error::ApiError),
        (status = 404, description = "Task or file not found", body = crate::error::ApiError)
    )
)]
pub async fn download_file(
    State(state): State<AppState>,
    Path((id, file)): Path<(TaskId, String)>,
) -> Result<Response> {
    if !is_plain_file_name(&file) {
        return Err(Error::InvalidRequest(format!("invalid file name '{file}'")));
    }

    let task = state.scheduler.get_task(id).await?;
    if task.status != TaskStatus::Completed {
        return Err(Error::TaskNotFound(id));
    }

    let path = task_dir(state.config.download_dir(), id).join(&file);
    let handle = match tokio::fs::File::open(&path).await {
        Ok(handle) => handle,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            let body = Json(ApiError::not_found(format!("file '{file}'")));
            return Ok((StatusCode::NOT_FOUND, body).into_response());
        }
        Err(e) => return Err(e.into()),
    };
    let length = handle.metadata().await?.len();

    let disposition = format!("attachment; filename=\"{}\"", file.replace('"', ""));
    Ok((
        [
            (header::CONTENT_TYPE, "application/octet-stream".to_string()),
            (header::CONTENT_LENGTH, length.to_string()),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        Body::from_stream(ReaderStream::new(handle)),
    )
        .into_response())
}
