use super::*;
use crate::scheduler::test_helpers::{MIB, MockEngine, create_test_scheduler, full_key};
use axum::body::Body;
use axum::extract::Request;
use axum::http::StatusCode;
use axum::response::Response;
use std::time::Duration;
use tower::ServiceExt;

mod files;
mod system;

/// Test app with an `admin` key holding every permission
struct TestApp {
    app: Router,
    scheduler: Arc<MediaScheduler>,
    admin_token: String,
    _temp_dir: tempfile::TempDir,
}

async fn create_test_app() -> TestApp {
    create_test_app_with(MockEngine::ok(MIB)).await
}

async fn create_test_app_with(engine: MockEngine) -> TestApp {
    let (scheduler, temp_dir) = create_test_scheduler(Arc::new(engine)).await;
    let admin_token = full_key(&scheduler, "admin").await;
    let scheduler = Arc::new(scheduler);
    let config = scheduler.get_config();
    let app = create_router(scheduler.clone(), config);

    TestApp {
        app,
        scheduler,
        admin_token,
        _temp_dir: temp_dir,
    }
}

fn get(uri: &str, token: Option<&str>) -> Request {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(token) = token {
        builder = builder.header("X-API-Key", token);
    }
    builder.body(Body::empty()).unwrap()
}

fn delete(uri: &str, token: Option<&str>) -> Request {
    let mut builder = Request::builder().method("DELETE").uri(uri);
    if let Some(token) = token {
        builder = builder.header("X-API-Key", token);
    }
    builder.body(Body::empty()).unwrap()
}

fn post_json(uri: &str, token: Option<&str>, body: serde_json::Value) -> Request {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("X-API-Key", token);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

async fn send(app: &Router, request: Request) -> Response {
    app.clone().oneshot(request).await.unwrap()
}

async fn json_body(response: Response) -> serde_json::Value {
    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn test_api_server_spawns() {
    let (scheduler, _temp_dir) = create_test_scheduler(Arc::new(MockEngine::ok(MIB))).await;

    // Port 0 = OS assigns a free port
    let mut config = (*scheduler.get_config()).clone();
    config.api.bind_address = "127.0.0.1:0".parse().unwrap();
    let config = Arc::new(config);

    let api_handle = tokio::spawn({
        let scheduler = Arc::new(scheduler);
        async move { start_api_server(scheduler, config).await }
    });

    tokio::time::sleep(Duration::from_millis(100)).await;
    assert!(!api_handle.is_finished(), "server should still be running");
    api_handle.abort();
}

#[tokio::test]
async fn test_cors_enabled() {
    let test_app = create_test_app().await;

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = send(&test_app.app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response
            .headers()
            .contains_key("access-control-allow-origin"),
        "CORS header should be present when CORS is enabled"
    );
}

#[tokio::test]
async fn test_cors_disabled() {
    let test_app = create_test_app().await;
    let mut config = (*test_app.scheduler.get_config()).clone();
    config.api.cors_enabled = false;
    let app = create_router(test_app.scheduler.clone(), Arc::new(config));

    let request = Request::builder()
        .uri("/health")
        .header("Origin", "http://localhost:3000")
        .body(Body::empty())
        .unwrap();

    let response = send(&app, request).await;

    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        !response
            .headers()
            .contains_key("access-control-allow-origin")
    );
}
