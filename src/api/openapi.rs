//! OpenAPI documentation and schema generation
//!
//! Defines the OpenAPI specification for the media-dl REST API using utoipa
//! for compile-time spec generation.

use utoipa::OpenApi;

/// OpenAPI documentation for the media-dl REST API
///
/// The spec can be accessed via:
/// - `/openapi.json` - JSON format OpenAPI specification
/// - `/swagger-ui` - Interactive Swagger UI documentation (document at `/api-docs/openapi.json`)
#[derive(OpenApi)]
#[openapi(
    info(
        title = "media-dl REST API",
        version = "0.1.0",
        description = "Multi-tenant media retrieval: submit fetch tasks under per-key quotas, poll their status and download the results",
        license(
            name = "MIT OR Apache-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        // Keys
        crate::api::routes::create_key,
        crate::api::routes::list_keys,
        crate::api::routes::get_key,
        crate::api::routes::delete_key,

        // Tasks
        crate::api::routes::submit_task,
        crate::api::routes::get_task,

        // Files
        crate::api::routes::download_file,

        // System
        crate::api::routes::health_check,
        crate::api::routes::openapi_spec,
        crate::api::routes::event_stream,
    ),
    components(schemas(
        // Core types from types.rs
        crate::types::TaskId,
        crate::types::TaskStatus,
        crate::types::TaskRequest,
        crate::types::TaskRecord,
        crate::types::Permission,
        crate::types::KeyInfo,
        crate::types::MemorySample,
        crate::types::TimeRange,
        crate::types::Event,

        // API request/response types from routes
        crate::api::routes::CreateKeyRequest,
        crate::api::routes::CreateKeyResponse,
        crate::api::routes::SubmitTaskResponse,

        // Error types from error.rs
        crate::error::ApiError,
        crate::error::ErrorDetail,
    )),
    tags(
        (name = "keys", description = "Key management - Create, list, inspect and delete API keys"),
        (name = "tasks", description = "Tasks - Submit fetch tasks and poll their status"),
        (name = "files", description = "Files - Download the artifacts of completed tasks"),
        (name = "system", description = "System endpoints - Health checks, OpenAPI spec, events"),
    ),
    modifiers(&SecurityAddon)
)]
pub struct ApiDoc;

/// Security addon to add API key authentication scheme to OpenAPI spec
struct SecurityAddon;

impl utoipa::Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = &mut openapi.components {
            components.add_security_scheme(
                "api_key",
                utoipa::openapi::security::SecurityScheme::ApiKey(
                    utoipa::openapi::security::ApiKey::Header(
                        utoipa::openapi::security::ApiKeyValue::new("X-API-Key"),
                    ),
                ),
            );
        }
    }
}
