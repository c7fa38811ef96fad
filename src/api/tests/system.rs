use super::*;

#[tokio::test]
async fn test_health_endpoint() {
    let test_app = create_test_app().await;

    let response = send(&test_app.app, get("/health", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["status"], "ok");
    assert_eq!(body["engine"], "mock");
    assert_eq!(body["accepting_tasks"], true);
}

#[tokio::test]
async fn test_openapi_endpoint() {
    let test_app = create_test_app().await;

    let response = send(&test_app.app, get("/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);

    let body = json_body(response).await;
    assert_eq!(body["info"]["title"], "media-dl REST API");
    assert!(body["paths"]["/tasks"].is_object());
}

#[tokio::test]
async fn test_events_endpoint_streams() {
    let test_app = create_test_app().await;

    let response = send(&test_app.app, get("/events", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()["content-type"]
            .to_str()
            .unwrap()
            .starts_with("text/event-stream")
    );
}

#[tokio::test]
async fn test_spawn_api_server_method() {
    let (scheduler, _temp_dir) = create_test_scheduler(Arc::new(MockEngine::ok(MIB))).await;

    let api_handle = scheduler.spawn_api_server();
    tokio::time::sleep(Duration::from_millis(100)).await;
    api_handle.abort();
}

#[tokio::test]
async fn test_default_api_config_serves_both_documents() {
    let test_app = create_test_app().await;
    let mut config = (*test_app.scheduler.get_config()).clone();
    config.api = crate::config::ApiConfig::default();
    assert!(config.api.swagger_ui);
    let app = create_router(test_app.scheduler.clone(), Arc::new(config));

    let response = send(&app, get("/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["info"]["title"], "media-dl REST API");

    let response = send(&app, get(SWAGGER_DOC_PATH, None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["info"]["title"], "media-dl REST API");
}

#[tokio::test]
async fn test_swagger_ui_can_be_disabled() {
    let test_app = create_test_app().await;
    let mut config = (*test_app.scheduler.get_config()).clone();
    config.api.swagger_ui = false;
    let app = create_router(test_app.scheduler.clone(), Arc::new(config));

    let response = send(&app, get(SWAGGER_DOC_PATH, None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(&app, get("/openapi.json", None)).await;
    assert_eq!(response.status(), StatusCode::OK);
}
