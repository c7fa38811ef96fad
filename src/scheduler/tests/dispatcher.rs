use super::*;

#[tokio::test]
async fn tick_dispatches_waiting_tasks() {
    let (scheduler, _dir) = create_test_scheduler(Arc::new(MockEngine::ok(MIB))).await;
    let token = full_key(&scheduler, "alice").await;

    let record = scheduler
        .submit_task(Some(&token), info_request(), None)
        .await
        .unwrap();

    scheduler.tick(Utc::now()).await.unwrap();

    let done = wait_for_status(&scheduler, record.id, TaskStatus::Completed).await;
    assert_eq!(done.file, Some(format!("{}/info.json", record.id)));
}

#[tokio::test]
async fn repeated_ticks_never_dispatch_a_task_twice() {
    let engine = Arc::new(MockEngine {
        delay: Some(Duration::from_millis(200)),
        ..MockEngine::ok(MIB)
    });
    let (scheduler, _dir) = create_test_scheduler(engine.clone()).await;
    let token = full_key(&scheduler, "alice").await;

    let record = scheduler
        .submit_task(Some(&token), video_request(), None)
        .await
        .unwrap();

    // the task stays `waiting` until its job runs, so several ticks may see it
    for _ in 0..5 {
        scheduler.tick(Utc::now()).await.unwrap();
    }
    wait_for_status(&scheduler, record.id, TaskStatus::Completed).await;
    for _ in 0..3 {
        scheduler.tick(Utc::now()).await.unwrap();
    }
    tokio::time::sleep(Duration::from_millis(50)).await;

    assert_eq!(engine.recorded().len(), 1);
}

#[tokio::test]
async fn pool_bounds_concurrent_tasks() {
    let engine = Arc::new(MockEngine {
        delay: Some(Duration::from_millis(300)),
        ..MockEngine::ok(MIB)
    });
    let (scheduler, _dir) = create_test_scheduler(engine).await;
    let token = full_key(&scheduler, "alice").await;

    let mut ids = Vec::new();
    for _ in 0..4 {
        let record = scheduler
            .submit_task(Some(&token), video_request(), None)
            .await
            .unwrap();
        ids.push(record.id);
    }

    scheduler.tick(Utc::now()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;

    let tasks = scheduler.store.tasks.snapshot().await.unwrap();
    let processing = tasks
        .values()
        .filter(|t| t.status == TaskStatus::Processing)
        .count();
    let waiting = tasks
        .values()
        .filter(|t| t.status == TaskStatus::Waiting)
        .count();
    assert_eq!(processing, 2);
    assert_eq!(waiting, 2);

    for id in ids {
        wait_for_status(&scheduler, id, TaskStatus::Completed).await;
    }
}

#[tokio::test]
async fn dispatcher_loop_runs_after_start() {
    let (scheduler, _dir) = create_test_scheduler(Arc::new(MockEngine::ok(MIB))).await;
    scheduler.start().await.unwrap();
    let token = full_key(&scheduler, "alice").await;

    let record = scheduler
        .submit_task(Some(&token), video_request(), None)
        .await
        .unwrap();

    let done = wait_for_status(&scheduler, record.id, TaskStatus::Completed).await;
    assert_eq!(done.file, Some(format!("{}/video.mp4", record.id)));

    scheduler.shutdown().await.unwrap();
}
