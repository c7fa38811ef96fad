use super::*;
use crate::types::{Permission, TimeRange};

async fn run_one(scheduler: &MediaScheduler, request: TaskRequest) -> TaskRecord {
    let token = full_key(scheduler, "alice").await;
    let record = scheduler
        .submit_task(Some(&token), request, None)
        .await
        .unwrap();
    scheduler.run_task(record.id).await;
    scheduler.get_task(record.id).await.unwrap()
}

#[tokio::test]
async fn info_task_writes_metadata_document() {
    let (scheduler, dir) = create_test_scheduler(Arc::new(MockEngine::ok(MIB))).await;

    let done = run_one(&scheduler, info_request()).await;

    assert_eq!(done.status, TaskStatus::Completed);
    assert_eq!(done.progress, Some(100.0));
    assert!(done.completed_at.is_some());
    let file = done.file.unwrap();
    assert_eq!(file, format!("{}/info.json", done.id));

    let written = std::fs::read_to_string(dir.path().join("downloads").join(&file)).unwrap();
    let info: serde_json::Value = serde_json::from_str(&written).unwrap();
    assert_eq!(info["title"], "Test video");

    // metadata fetches reserve no memory
    let key = scheduler.admission().get_key("alice").await.unwrap();
    assert_eq!(key.memory_in_use, 0);
}

#[tokio::test]
async fn video_task_downloads_into_task_directory() {
    let engine = Arc::new(MockEngine::ok(10 * MIB));
    let (scheduler, dir) = create_test_scheduler(engine.clone()).await;

    let done = run_one(&scheduler, video_request()).await;

    assert_eq!(done.status, TaskStatus::Completed, "{:?}", done.error);
    assert_eq!(done.file, Some(format!("{}/video.mp4", done.id)));

    let requests = engine.recorded();
    assert_eq!(requests.len(), 1);
    let request = &requests[0];
    assert_eq!(request.format, "bestvideo+bestaudio/best");
    assert_eq!(request.output_template, "video.%(ext)s");
    assert_eq!(request.merge_format.as_deref(), Some("mp4"));
    assert_eq!(
        request.output_dir,
        dir.path().join("downloads").join(done.id.to_string())
    );
    assert_eq!(request.range, None);

    // estimate plus ten percent headroom
    let key = scheduler.admission().get_key("alice").await.unwrap();
    assert_eq!(key.memory_in_use, 11 * MIB);
}

#[tokio::test]
async fn live_audio_task_records_window_with_keyframes() {
    let engine = Arc::new(MockEngine {
        files: vec!["audio.m4a".into()],
        ..MockEngine::ok(MIB)
    });
    let (scheduler, _dir) = create_test_scheduler(engine.clone()).await;

    let done = run_one(
        &scheduler,
        TaskRequest::FetchLiveAudio {
            url: "https://example.com/live".into(),
            start: 5,
            duration: 60,
            audio_format: "bestaudio".into(),
        },
    )
    .await;

    assert_eq!(done.status, TaskStatus::Completed, "{:?}", done.error);
    assert_eq!(done.file, Some(format!("{}/audio.m4a", done.id)));

    let request = &engine.recorded()[0];
    assert_eq!(request.format, "bestaudio/best");
    assert_eq!(request.merge_format, None);
    assert!(request.force_keyframes);
    assert_eq!(
        request.range,
        Some(TimeRange {
            start: 5.0,
            end: 65.0
        })
    );

    // the size estimate covers the same window
    assert_eq!(
        engine.estimated_ranges.lock().unwrap().as_slice(),
        &[Some(TimeRange {
            start: 5.0,
            end: 65.0
        })]
    );
}

#[tokio::test]
async fn task_route_overrides_default_proxy() {
    let temp_dir = tempfile::tempdir().unwrap();
    let mut config = test_config(temp_dir.path());
    config.download.default_proxy = Some("http://default-proxy:3128".into());
    let engine = Arc::new(MockEngine::ok(MIB));
    let scheduler = MediaScheduler::with_engine(config, engine.clone())
        .await
        .unwrap();
    let token = full_key(&scheduler, "alice").await;

    let routed = scheduler
        .submit_task(
            Some(&token),
            video_request(),
            Some("socks5://task-proxy:1080".into()),
        )
        .await
        .unwrap();
    let unrouted = scheduler
        .submit_task(Some(&token), video_request(), None)
        .await
        .unwrap();
    scheduler.run_task(routed.id).await;
    scheduler.run_task(unrouted.id).await;

    let proxies: Vec<Option<String>> = engine.recorded().into_iter().map(|r| r.proxy).collect();
    assert_eq!(
        proxies,
        vec![
            Some("socks5://task-proxy:1080".to_string()),
            Some("http://default-proxy:3128".to_string())
        ]
    );
}

#[tokio::test]
async fn memory_quota_is_rechecked_after_estimation() {
    // 95 MiB plus headroom does not fit in the 100 MiB quota
    let engine = Arc::new(MockEngine::ok(95 * MIB));
    let (scheduler, _dir) = create_test_scheduler(engine.clone()).await;

    let done = run_one(&scheduler, video_request()).await;

    assert_eq!(done.status, TaskStatus::Error);
    assert!(done.error.unwrap().starts_with("Memory limit exceeded"));
    assert!(engine.recorded().is_empty(), "nothing should be downloaded");

    let key = scheduler.admission().get_key("alice").await.unwrap();
    assert_eq!(key.memory_in_use, 0);
}

#[tokio::test]
async fn unknown_size_fails_the_task() {
    let engine = Arc::new(MockEngine {
        size: None,
        ..MockEngine::ok(MIB)
    });
    let (scheduler, _dir) = create_test_scheduler(engine).await;

    let done = run_one(&scheduler, video_request()).await;

    assert_eq!(done.status, TaskStatus::Error);
    assert!(done.error.unwrap().contains("size estimation failed"));
}

#[tokio::test]
async fn engine_failure_is_recorded_on_the_task() {
    let engine = Arc::new(MockEngine {
        fail_with: Some("ERROR: Unsupported URL".into()),
        ..MockEngine::ok(MIB)
    });
    let (scheduler, _dir) = create_test_scheduler(engine).await;
    let mut events = scheduler.subscribe();

    let done = run_one(&scheduler, info_request()).await;

    assert_eq!(done.status, TaskStatus::Error);
    assert_eq!(
        done.error.as_deref(),
        Some("extraction failed: ERROR: Unsupported URL")
    );
    assert!(done.file.is_none());

    let mut saw_failed = false;
    while let Ok(event) = events.try_recv() {
        if let Event::Failed { id, .. } = event {
            assert_eq!(id, done.id);
            saw_failed = true;
        }
    }
    assert!(saw_failed);
}

#[tokio::test]
async fn download_without_output_file_fails() {
    let engine = Arc::new(MockEngine {
        files: Vec::new(),
        ..MockEngine::ok(MIB)
    });
    let (scheduler, _dir) = create_test_scheduler(engine).await;

    let done = run_one(&scheduler, video_request()).await;

    assert_eq!(done.status, TaskStatus::Error);
    assert!(done.error.unwrap().contains("without producing a file"));
}

#[tokio::test]
async fn panicking_job_fails_only_its_own_task() {
    let panicking = Arc::new(MockEngine {
        panic: true,
        ..MockEngine::ok(MIB)
    });
    let (scheduler, _dir) = create_test_scheduler(panicking).await;

    let done = run_one(&scheduler, video_request()).await;
    assert_eq!(done.status, TaskStatus::Error);
    assert!(done.error.unwrap().contains("panicked"));

    // info tasks never reach fetch_media, so the pool still completes them
    let token = scheduler
        .admission()
        .create_key("bob", Permission::ALL.into_iter().collect())
        .await
        .unwrap();
    let next = scheduler
        .submit_task(Some(&token), info_request(), None)
        .await
        .unwrap();
    scheduler.tick(Utc::now()).await.unwrap();
    wait_for_status(&scheduler, next.id, TaskStatus::Completed).await;
}

#[tokio::test]
async fn progress_is_reported_monotonically() {
    let engine = Arc::new(MockEngine {
        progress: vec![10.0, 55.5, 30.0, 150.0],
        ..MockEngine::ok(MIB)
    });
    let (scheduler, _dir) = create_test_scheduler(engine).await;
    let mut events = scheduler.subscribe();

    let done = run_one(&scheduler, video_request()).await;
    assert_eq!(done.status, TaskStatus::Completed);

    let mut reported = Vec::new();
    while let Ok(event) = events.try_recv() {
        if let Event::Progress { percent, .. } = event {
            reported.push(percent);
        }
    }
    assert_eq!(reported, vec![10.0, 55.5, 100.0]);
}

#[tokio::test]
async fn non_waiting_task_is_not_run_again() {
    let engine = Arc::new(MockEngine::ok(MIB));
    let (scheduler, _dir) = create_test_scheduler(engine.clone()).await;

    let done = run_one(&scheduler, video_request()).await;
    assert_eq!(done.status, TaskStatus::Completed);

    scheduler.run_task(done.id).await;
    assert_eq!(engine.recorded().len(), 1);
    assert_eq!(scheduler.get_task(done.id).await.unwrap(), done);
}
