//! REST API server module
//!
//! Exposes key management, task submission, task status and artifact
//! downloads over HTTP. Credentials travel in the `X-API-Key` header and every
//! protected route runs the admission gate for its permission.

use crate::{Config, MediaScheduler, Result};
use axum::{
    Router,
    http::HeaderValue,
    routing::{get, post},
};
use std::sync::Arc;
use tokio::net::TcpListener;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

pub mod auth;
pub mod error_response;
pub mod openapi;
pub mod routes;
pub mod state;

pub use openapi::ApiDoc;
pub use state::AppState;

/// OpenAPI document path served by the Swagger UI bundle
pub const SWAGGER_DOC_PATH: &str = "/api-docs/openapi.json";

/// Create the API router with all route definitions
///
/// # Routes
///
/// ## Keys
/// - `POST /keys` - Create a key (`create_key`)
/// - `GET /keys` - List keys (`get_keys`)
/// - `GET /keys/:name` - Get one key (`get_key`)
/// - `DELETE /keys/:name` - Delete a key (`delete_key`)
///
/// ## Tasks
/// - `POST /tasks` - Submit a task (permission depends on the task type)
/// - `GET /tasks/:id` - Task status
///
/// ## Files
/// - `GET /files/:id/:file` - Download a task artifact
///
/// ## System
/// - `GET /health` - Health check
/// - `GET /openapi.json` - OpenAPI specification
/// - `GET /swagger-ui` - Interactive Swagger UI documentation (if enabled, document at
///   [`SWAGGER_DOC_PATH`])
/// - `GET /events` - Server-sent events stream
pub fn create_router(scheduler: Arc<MediaScheduler>, config: Arc<Config>) -> Router {
    let state = AppState::new(scheduler, config.clone());

    let router = Router::new()
        // Keys
        .route("/keys", post(routes::create_key).get(routes::list_keys))
        .route(
            "/keys/:name",
            get(routes::get_key).delete(routes::delete_key),
        )
        // Tasks
        .route("/tasks", post(routes::submit_task))
        .route("/tasks/:id", get(routes::get_task))
        // Files
        .route("/files/:id/:file", get(routes::download_file))
        // System
        .route("/health", get(routes::health_check))
        .route("/openapi.json", get(routes::openapi_spec))
        .route("/events", get(routes::event_stream));

    // Merge Swagger UI routes if enabled in config (before applying state).
    // SwaggerUi registers its own document route, which must not collide with
    // the hand-written /openapi.json above.
    let router = if config.api.swagger_ui {
        router.merge(SwaggerUi::new("/swagger-ui").url(SWAGGER_DOC_PATH, ApiDoc::openapi()))
    } else {
        router
    };

    let router = router.with_state(state).layer(TraceLayer::new_for_http());

    if config.api.cors_enabled {
        let cors = build_cors_layer(&config.api.cors_origins);
        router.layer(cors)
    } else {
        router
    }
}

/// Build a CORS layer based on configured origins
///
/// `"*"` (or an empty list) allows any origin.
fn build_cors_layer(origins: &[String]) -> CorsLayer {
    let allow_any = origins.iter().any(|o| o == "*");

    if allow_any || origins.is_empty() {
        CorsLayer::new()
            .allow_origin(Any)
            .allow_methods(Any)
            .allow_headers(Any)
    } else {
        let allowed: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();

        CorsLayer::new()
            .allow_origin(AllowOrigin::list(allowed))
            .allow_methods(Any)
            .allow_headers(Any)
    }
}

/// Start the API server on the configured bind address.
///
/// Runs until the server stops.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaScheduler};
/// use std::sync::Arc;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = Arc::new(Config::default());
/// let scheduler = Arc::new(MediaScheduler::new((*config).clone()).await?);
///
/// // Start API server (blocks until shutdown)
/// media_dl::api::start_api_server(scheduler, config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn start_api_server(scheduler: Arc<MediaScheduler>, config: Arc<Config>) -> Result<()> {
    let bind_address = config.api.bind_address;

    tracing::info!(address = %bind_address, "Starting API server");

    let app = create_router(scheduler, config);

    let listener = TcpListener::bind(bind_address)
        .await
        .map_err(crate::error::Error::Io)?;

    tracing::info!(address = %bind_address, "API server listening");

    axum::serve(listener, app)
        .await
        .map_err(|e| crate::error::Error::ApiServerError(e.to_string()))?;

    tracing::info!("API server stopped");
    Ok(())
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
