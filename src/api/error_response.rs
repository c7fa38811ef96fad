//! HTTP error response handling for the API
//!
//! This module provides conversions from domain errors to HTTP responses
//! with appropriate status codes and JSON error bodies.

use crate::error::{ApiError, Error, ToHttpStatus};
use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};

/// Implement IntoResponse for Error to automatically convert errors to HTTP responses
impl IntoResponse for Error {
    fn into_response(self) -> Response {
        let status_code =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status_code.is_server_error() {
            tracing::error!(error = %self, "request failed");
        }

        let api_error: ApiError = self.into();

        (status_code, Json(api_error)).into_response()
    }
}

/// Implement IntoResponse for ApiError for explicit error responses
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        // Default to 500 if we're directly converting an ApiError
        // (usually errors go through Error::into_response which has the status code)
        (StatusCode::INTERNAL_SERVER_ERROR, Json(self)).into_response()
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Permission, TaskId};

    async fn body_of(response: Response) -> ApiError {
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&body).unwrap()
    }

    #[tokio::test]
    async fn test_task_not_found_into_response() {
        let id = TaskId::new();
        let response = Error::TaskNotFound(id).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);

        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "task_not_found");
        assert!(api_error.error.message.contains(&id.to_string()));
        assert_eq!(
            api_error.error.details.unwrap()["task_id"],
            id.to_string()
        );
    }

    #[tokio::test]
    async fn test_forbidden_into_response() {
        let response = Error::Forbidden {
            permission: Permission::DeleteKey,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let api_error = body_of(response).await;
        assert_eq!(api_error.error.code, "forbidden");
        assert_eq!(
            api_error.error.details.unwrap()["required_permission"],
            "delete_key"
        );
    }

    #[tokio::test]
    async fn test_rate_limit_into_response() {
        let response = Error::RateLimitExceeded {
            limit: 60,
            window_minutes: 10,
        }
        .into_response();

        assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);

        let api_error = body_of(response).await;
        assert_eq!(
            api_error.error.message,
            "Rate limit exceeded. Maximum 60 requests per 10 minutes."
        );
    }

    #[tokio::test]
    async fn test_api_error_defaults_to_internal_server_error() {
        let response = ApiError::not_found("thing").into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
