//! Key management handlers.

use super::{CreateKeyRequest, CreateKeyResponse};
use crate::admission::normalize_key_name;
use crate::api::AppState;
use crate::api::auth::authorize;
use crate::error::Result;
use crate::types::{KeyInfo, Permission};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

/// POST /keys - Create a key
#[utoipa::path(
    post,
    path = "/keys",
    tag = "keys",
    request_body = CreateKeyRequest,
    responses(
        (status = 201, description = "Key created", body = CreateKeyResponse),
        (status = 400, description = "Invalid key name", body = crate::error::ApiError),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 403, description = "Key lacks create_key", body = crate::error::ApiError),
        (status = 409, description = "A key with this name exists", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn create_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<CreateKeyRequest>,
) -> Result<impl IntoResponse> {
    authorize(&state, &headers, Permission::CreateKey).await?;

    let permissions = body.permissions.into_iter().collect();
    let key = state
        .scheduler
        .admission()
        .create_key(&body.name, permissions)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateKeyResponse {
            name: normalize_key_name(&body.name).to_string(),
            key,
        }),
    ))
}

/// GET /keys - List keys
#[utoipa::path(
    get,
    path = "/keys",
    tag = "keys",
    responses(
        (status = 200, description = "All keys (tokens omitted)", body = Vec<KeyInfo>),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 403, description = "Key lacks get_keys", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn list_keys(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<Vec<KeyInfo>>> {
    authorize(&state, &headers, Permission::GetKeys).await?;
    Ok(Json(state.scheduler.admission().list_keys().await?))
}

/// GET /keys/:name - Get one key
#[utoipa::path(
    get,
    path = "/keys/{name}",
    tag = "keys",
    params(
        ("name" = String, Path, description = "Key name")
    ),
    responses(
        (status = 200, description = "Key information (token omitted)", body = KeyInfo),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 403, description = "Key lacks get_key", body = crate::error::ApiError),
        (status = 404, description = "Key not found", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn get_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<Json<KeyInfo>> {
    authorize(&state, &headers, Permission::GetKey).await?;
    Ok(Json(state.scheduler.admission().get_key(&name).await?))
}

/// DELETE /keys/:name - Delete a key
#[utoipa::path(
    delete,
    path = "/keys/{name}",
    tag = "keys",
    params(
        ("name" = String, Path, description = "Key name")
    ),
    responses(
        (status = 204, description = "Key deleted"),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ApiError),
        (status = 403, description = "Key lacks delete_key", body = crate::error::ApiError),
        (status = 404, description = "Key not found", body = crate::error::ApiError)
    ),
    security(("api_key" = []))
)]
pub async fn delete_key(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(name): Path<String>,
) -> Result<StatusCode> {
    authorize(&state, &headers, Permission::DeleteKey).await?;
    state.scheduler.admission().delete_key(&name).await?;
    tracing::info!(key = %name, "key deleted");
    Ok(StatusCode::NO_CONTENT)
}
