use super::*;
use crate::scheduler::test_helpers::{info_request, video_request, wait_for_status};
use crate::types::{TaskId, TaskStatus};

async fn completed_video(test_app: &TestApp) -> TaskId {
    let record = test_app
        .scheduler
        .submit_task(Some(&test_app.admin_token), video_request(), None)
        .await
        .unwrap();
    test_app.scheduler.tick(chrono::Utc::now()).await.unwrap();
    wait_for_status(&test_app.scheduler, record.id, TaskStatus::Completed).await;
    record.id
}

#[tokio::test]
async fn test_download_completed_artifact() {
    let test_app = create_test_app().await;
    let id = completed_video(&test_app).await;

    let response = send(&test_app.app, get(&format!("/files/{id}/video.mp4"), None)).await;
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()["content-type"],
        "application/octet-stream"
    );
    assert_eq!(
        response.headers()["content-disposition"],
        "attachment; filename=\"video.mp4\""
    );

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&body[..], b"media");
}

#[tokio::test]
async fn test_missing_file_is_404() {
    let test_app = create_test_app().await;
    let id = completed_video(&test_app).await;

    let response = send(&test_app.app, get(&format!("/files/{id}/other.mkv"), None)).await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_path_traversal_is_rejected() {
    let test_app = create_test_app().await;
    let id = completed_video(&test_app).await;

    let response = send(
        &test_app.app,
        get(&format!("/files/{id}/..%2F..%2Fdb%2Fkeys.json"), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_unfinished_task_has_no_files() {
    let test_app = create_test_app().await;
    let record = test_app
        .scheduler
        .submit_task(Some(&test_app.admin_token), info_request(), None)
        .await
        .unwrap();

    let response = send(
        &test_app.app,
        get(&format!("/files/{}/info.json", record.id), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);

    let response = send(
        &test_app.app,
        get(&format!("/files/{}/info.json", TaskId::new()), None),
    )
    .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
