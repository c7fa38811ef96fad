//! Shared test helpers for creating MediaScheduler instances in tests.

use crate::config::{Config, PersistenceConfig, QuotaConfig, RetentionConfig, WorkerConfig};
use crate::engine::{ExtractionEngine, MediaRequest, ProgressCallback};
use crate::error::{Error, Result};
use crate::scheduler::MediaScheduler;
use crate::types::{Permission, TaskId, TaskRecord, TaskRequest, TaskStatus, TimeRange};
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::tempdir;

pub(crate) const MIB: u64 = 1024 * 1024;

/// Scriptable engine that never touches the network
#[derive(Default)]
pub(crate) struct MockEngine {
    /// Value returned by `estimate_size`
    pub size: Option<u64>,
    /// Document returned by `fetch_metadata`
    pub metadata: serde_json::Value,
    /// Files written into the output directory by `fetch_media`
    pub files: Vec<String>,
    /// Progress values reported during `fetch_media`
    pub progress: Vec<f32>,
    /// Makes every engine call fail with `ExtractionFailed`
    pub fail_with: Option<String>,
    /// Makes `fetch_media` panic
    pub panic: bool,
    /// Time `fetch_media` takes
    pub delay: Option<Duration>,
    /// Every download request received
    pub requests: Mutex<Vec<MediaRequest>>,
    /// Range passed to every `estimate_size` call
    pub estimated_ranges: Mutex<Vec<Option<TimeRange>>>,
}

impl MockEngine {
    /// Engine whose downloads succeed with a single `video.mp4`
    pub(crate) fn ok(size: u64) -> Self {
        Self {
            size: Some(size),
            metadata: serde_json::json!({ "id": "abc", "title": "Test video" }),
            files: vec!["video.mp4".into()],
            ..Default::default()
        }
    }

    pub(crate) fn recorded(&self) -> Vec<MediaRequest> {
        self.requests.lock().unwrap().clone()
    }

    fn check_failure(&self) -> Result<()> {
        match &self.fail_with {
            Some(message) => Err(Error::ExtractionFailed(message.clone())),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl ExtractionEngine for MockEngine {
    async fn estimate_size(
        &self,
        _url: &str,
        _video_format: Option<&str>,
        _audio_format: Option<&str>,
        range: Option<TimeRange>,
        _proxy: Option<&str>,
    ) -> Result<Option<u64>> {
        self.estimated_ranges.lock().unwrap().push(range);
        self.check_failure()?;
        Ok(self.size)
    }

    async fn fetch_metadata(&self, _url: &str, _proxy: Option<&str>) -> Result<serde_json::Value> {
        self.check_failure()?;
        Ok(self.metadata.clone())
    }

    async fn fetch_media(
        &self,
        request: MediaRequest,
        progress: ProgressCallback,
    ) -> Result<PathBuf> {
        self.requests.lock().unwrap().push(request.clone());
        if self.panic {
            panic!("engine exploded");
        }
        self.check_failure()?;

        for percent in &self.progress {
            progress(*percent);
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        for file in &self.files {
            tokio::fs::write(request.output_dir.join(file), b"media").await?;
        }
        Ok(request.output_dir)
    }

    fn name(&self) -> &'static str {
        "mock"
    }
}

/// Config rooted in `root` with a small quota for tests
pub(crate) fn test_config(root: &std::path::Path) -> Config {
    Config {
        quota: QuotaConfig {
            request_limit: 5,
            memory_limit_bytes: 100 * MIB,
            memory_window: Duration::from_secs(600),
        },
        retention: RetentionConfig {
            task_retention: Duration::from_secs(600),
            orphan_sweep_interval: Duration::from_secs(300),
            tick_interval: Duration::from_millis(20),
        },
        workers: WorkerConfig { max_workers: 2 },
        persistence: PersistenceConfig::Json {
            dir: root.join("db"),
        },
        download: crate::config::DownloadConfig {
            download_dir: root.join("downloads"),
            default_proxy: None,
        },
        ..Default::default()
    }
}

/// Helper to create a test MediaScheduler over JSON documents in a temp dir.
/// Returns the scheduler and the tempdir (which must be kept alive).
pub(crate) async fn create_test_scheduler(
    engine: Arc<dyn ExtractionEngine>,
) -> (MediaScheduler, tempfile::TempDir) {
    let temp_dir = tempdir().unwrap();
    let config = test_config(temp_dir.path());
    let scheduler = MediaScheduler::with_engine(config, engine).await.unwrap();
    (scheduler, temp_dir)
}

/// Create a key holding every permission and return its token
pub(crate) async fn full_key(scheduler: &MediaScheduler, name: &str) -> String {
    scheduler
        .admission()
        .create_key(name, Permission::ALL.into_iter().collect::<BTreeSet<_>>())
        .await
        .unwrap()
}

pub(crate) fn info_request() -> TaskRequest {
    TaskRequest::FetchInfo {
        url: "https://example.com/watch?v=abc".into(),
    }
}

pub(crate) fn video_request() -> TaskRequest {
    TaskRequest::FetchVideo {
        url: "https://example.com/watch?v=abc".into(),
        video_format: "bestvideo".into(),
        audio_format: "bestaudio".into(),
        start_time: None,
        end_time: None,
        force_keyframes: false,
    }
}

/// Poll the registry until the task reaches `status` (panics after 5 seconds)
pub(crate) async fn wait_for_status(
    scheduler: &MediaScheduler,
    id: TaskId,
    status: TaskStatus,
) -> TaskRecord {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(5);
    loop {
        let record = scheduler.get_task(id).await.unwrap();
        if record.status == status {
            return record;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "task {id} stuck in {} waiting for {status}",
            record.status
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}
