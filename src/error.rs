//! Error types for media-dl
//!
//! This module provides error handling for the library, including:
//! - The admission taxonomy (authentication, permissions, rate and memory quotas)
//! - Execution failures recorded on tasks (size estimation, extraction)
//! - HTTP status code mapping and structured error responses for the REST binding

use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;

use crate::types::{Permission, TaskId, TaskStatus};

/// Result type alias for media-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for media-dl
#[derive(Debug, Error)]
pub enum Error {
    /// No credential was presented
    #[error("No API key provided")]
    Unauthenticated,

    /// The presented credential does not resolve to a key
    #[error("Invalid API key")]
    InvalidKey,

    /// The resolved key lacks the capability the operation requires
    #[error("Insufficient permissions: {permission} required")]
    Forbidden {
        /// The permission that was required
        permission: Permission,
    },

    /// The key owns as many live tasks as the request ceiling allows
    #[error("Rate limit exceeded. Maximum {limit} requests per {window_minutes} minutes.")]
    RateLimitExceeded {
        /// Configured request ceiling
        limit: usize,
        /// Length of the accounting window in minutes
        window_minutes: u64,
    },

    /// Admitting the requested size would push the key over its memory quota
    #[error(
        "Memory limit exceeded. Maximum {limit} bytes per {window_minutes} minutes \
         ({used} bytes in use, {requested} bytes requested)."
    )]
    MemoryLimitExceeded {
        /// Bytes already reserved inside the window
        used: u64,
        /// Bytes requested by this admission
        requested: u64,
        /// Configured quota in bytes
        limit: u64,
        /// Length of the accounting window in minutes
        window_minutes: u64,
    },

    /// The extraction engine could not determine the size of the selected formats
    #[error("size estimation failed: {0}")]
    SizeEstimationFailed(String),

    /// The extraction engine failed while fetching metadata or media
    #[error("extraction failed: {0}")]
    ExtractionFailed(String),

    /// Task not found in the registry
    #[error("task {0} not found")]
    TaskNotFound(TaskId),

    /// Key not found in the registry
    #[error("key '{0}' not found")]
    KeyNotFound(String),

    /// A key with this name already exists
    #[error("key '{0}' already exists")]
    KeyExists(String),

    /// The submitted request is malformed
    #[error("invalid request: {0}")]
    InvalidRequest(String),

    /// A state transition that the task state machine does not allow
    #[error("task {id} cannot move from {from} to {to}")]
    InvalidTransition {
        /// The task that was being transitioned
        id: TaskId,
        /// Current status
        from: TaskStatus,
        /// Requested status
        to: TaskStatus,
    },

    /// The dispatcher loop was already started
    #[error("dispatcher already started")]
    AlreadyStarted,

    /// Shutdown in progress - not accepting new tasks
    #[error("shutdown in progress: not accepting new tasks")]
    ShuttingDown,

    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "download_dir")
        key: Option<String>,
    },

    /// Document store operation failed
    #[error("database error: {0}")]
    Database(#[from] DatabaseError),

    /// SQLx database error
    #[error("database error: {0}")]
    Sqlx(#[from] sqlx::Error),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// External tool execution failed (yt-dlp)
    #[error("external tool error: {0}")]
    ExternalTool(String),

    /// Operation not supported (missing binary, not implemented, etc.)
    #[error("not supported: {0}")]
    NotSupported(String),

    /// API server error
    #[error("API server error: {0}")]
    ApiServerError(String),

    /// Other error
    #[error("{0}")]
    Other(String),
}

/// Document store errors
#[derive(Debug, Error)]
pub enum DatabaseError {
    /// Failed to open the store
    #[error("failed to connect to database: {0}")]
    ConnectionFailed(String),

    /// Failed to run migrations
    #[error("failed to run migrations: {0}")]
    MigrationFailed(String),

    /// Query failed
    #[error("query failed: {0}")]
    QueryFailed(String),

    /// A stored document could not be decoded
    #[error("corrupt document '{name}': {reason}")]
    CorruptDocument {
        /// Document name (e.g., "tasks")
        name: String,
        /// Decoder message
        reason: String,
    },
}

/// API error response format
///
/// # Example JSON Response
///
/// ```json
/// {
///   "error": {
///     "code": "task_not_found",
///     "message": "task 1c0e... not found",
///     "details": { "task_id": "1c0e..." }
///   }
/// }
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// The error details
    pub error: ErrorDetail,
}

/// Detailed error information for API responses
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Machine-readable error code (e.g., "rate_limit_exceeded")
    pub code: String,

    /// Human-readable error message
    pub message: String,

    /// Optional additional context about the error
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl ApiError {
    /// Create a new API error with code and message
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorDetail {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    /// Create a "not found" error
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new("not_found", format!("{} not found", resource.into()))
    }
}

/// Convert errors to HTTP status codes for API responses
pub trait ToHttpStatus {
    /// Get the HTTP status code for this error
    fn status_code(&self) -> u16;

    /// Get the machine-readable error code
    fn error_code(&self) -> &str;
}

impl ToHttpStatus for Error {
    fn status_code(&self) -> u16 {
        match self {
            // 401 Unauthorized
            Error::Unauthenticated | Error::InvalidKey => 401,

            // 403 Forbidden
            Error::Forbidden { .. } => 403,

            // 429 Too Many Requests - quota exhaustion
            Error::RateLimitExceeded { .. } | Error::MemoryLimitExceeded { .. } => 429,

            // 400 Bad Request
            Error::InvalidRequest(_) | Error::Config { .. } => 400,

            // 404 Not Found
            Error::TaskNotFound(_) | Error::KeyNotFound(_) => 404,

            // 409 Conflict
            Error::KeyExists(_) | Error::InvalidTransition { .. } | Error::AlreadyStarted => 409,

            // 422 Unprocessable Entity - the engine rejected the source
            Error::SizeEstimationFailed(_) => 422,

            // 502 Bad Gateway - external engine errors
            Error::ExtractionFailed(_) => 502,

            // 503 Service Unavailable
            Error::ShuttingDown | Error::ExternalTool(_) => 503,

            // 501 Not Implemented
            Error::NotSupported(_) => 501,

            // 500 Internal Server Error
            Error::Database(_)
            | Error::Sqlx(_)
            | Error::Io(_)
            | Error::Serialization(_)
            | Error::ApiServerError(_)
            | Error::Other(_) => 500,
        }
    }

    fn error_code(&self) -> &str {
        match self {
            Error::Unauthenticated => "unauthenticated",
            Error::InvalidKey => "invalid_key",
            Error::Forbidden { .. } => "forbidden",
            Error::RateLimitExceeded { .. } => "rate_limit_exceeded",
            Error::MemoryLimitExceeded { .. } => "memory_limit_exceeded",
            Error::SizeEstimationFailed(_) => "size_estimation_failed",
            Error::ExtractionFailed(_) => "extraction_failed",
            Error::TaskNotFound(_) => "task_not_found",
            Error::KeyNotFound(_) => "key_not_found",
            Error::KeyExists(_) => "key_exists",
            Error::InvalidRequest(_) => "invalid_request",
            Error::InvalidTransition { .. } => "invalid_transition",
            Error::AlreadyStarted => "already_started",
            Error::ShuttingDown => "shutting_down",
            Error::Config { .. } => "config_error",
            Error::Database(_) | Error::Sqlx(_) => "database_error",
            Error::Io(_) => "io_error",
            Error::Serialization(_) => "serialization_error",
            Error::ExternalTool(_) => "external_tool_error",
            Error::NotSupported(_) => "not_supported",
            Error::ApiServerError(_) => "api_server_error",
            Error::Other(_) => "internal_error",
        }
    }
}

impl From<Error> for ApiError {
    fn from(error: Error) -> Self {
        let code = error.error_code().to_string();
        let message = error.to_string();

        let details = match &error {
            Error::Forbidden { permission } => Some(serde_json::json!({
                "required_permission": permission,
            })),
            Error::RateLimitExceeded {
                limit,
                window_minutes,
            } => Some(serde_json::json!({
                "limit": limit,
                "window_minutes": window_minutes,
            })),
            Error::MemoryLimitExceeded {
                used,
                requested,
                limit,
                window_minutes,
            } => Some(serde_json::json!({
                "used_bytes": used,
                "requested_bytes": requested,
                "limit_bytes": limit,
                "window_minutes": window_minutes,
            })),
            Error::TaskNotFound(id) => Some(serde_json::json!({
                "task_id": id,
            })),
            Error::KeyNotFound(name) | Error::KeyExists(name) => Some(serde_json::json!({
                "name": name,
            })),
            Error::InvalidTransition { id, from, to } => Some(serde_json::json!({
                "task_id": id,
                "from": from,
                "to": to,
            })),
            _ => None,
        };

        ApiError {
            error: ErrorDetail {
                code,
                message,
                details,
            },
        }
    }
}
