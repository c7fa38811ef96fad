//! Route handlers for the REST API
//!
//! Handlers are organized by domain:
//! - [`keys`] - Key management
//! - [`tasks`] - Task submission and status
//! - [`files`] - Artifact downloads
//! - [`system`] - Health, events, OpenAPI

use crate::types::{Permission, TaskRequest};
use serde::{Deserialize, Serialize};

mod files;
mod keys;
mod system;
mod tasks;

// Re-export all handlers so `routes::function_name` works
pub use files::*;
pub use keys::*;
pub use system::*;
pub use tasks::*;

// ============================================================================
// Request/Response Types (shared across handlers)
// ============================================================================

/// Request body for POST /keys
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateKeyRequest {
    /// Unique key name
    pub name: String,
    /// Permissions granted to the key
    pub permissions: Vec<Permission>,
}

/// Response for POST /keys - the only time a token is returned
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct CreateKeyResponse {
    /// Key name
    pub name: String,
    /// Secret token for the `X-API-Key` header
    pub key: String,
}

/// Request body for POST /tasks
///
/// The task fields (tagged by `task_type`) plus an optional route override.
#[derive(Debug, Deserialize, Serialize)]
pub struct SubmitTaskRequest {
    /// What to fetch
    #[serde(flatten)]
    pub request: TaskRequest,
    /// Proxy URL used instead of the configured default
    #[serde(default)]
    pub proxy: Option<String>,
}

/// Response for POST /tasks
#[derive(Debug, Deserialize, Serialize, utoipa::ToSchema)]
pub struct SubmitTaskResponse {
    /// Id of the queued task
    pub task_id: crate::types::TaskId,
    /// Initial status (always `waiting`)
    pub status: crate::types::TaskStatus,
}
