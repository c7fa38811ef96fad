//! Task execution against the extraction engine.

use crate::engine::{MediaRequest, ProgressCallback};
use crate::error::{Error, Result};
use crate::types::{Event, TaskId, TaskRecord, TaskRequest, TimeRange};
use crate::utils::{clip_range, first_file_name, live_range, task_dir};
use chrono::Utc;
use std::sync::Arc;
use tokio::sync::mpsc;

use super::MediaScheduler;

/// File name of the metadata document written by info tasks
pub(crate) const INFO_FILE_NAME: &str = "info.json";

/// Headroom added to size estimates before reserving memory (one tenth)
const SIZE_INFLATION_DIVISOR: u64 = 10;

/// Fully resolved download: what to fetch and how to name it
struct MediaPlan {
    url: String,
    video_format: Option<String>,
    audio_format: String,
    range: Option<TimeRange>,
    force_keyframes: bool,
}

impl MediaPlan {
    fn from_request(request: &TaskRequest) -> Result<Option<Self>> {
        let plan = match request {
            TaskRequest::FetchInfo { .. } => return Ok(None),
            TaskRequest::FetchVideo {
                url,
                video_format,
                audio_format,
                start_time,
                end_time,
                force_keyframes,
            } => Self {
                url: url.clone(),
                video_format: Some(video_format.clone()),
                audio_format: audio_format.clone(),
                range: clip_range(start_time.as_deref(), end_time.as_deref())?,
                force_keyframes: *force_keyframes,
            },
            TaskRequest::FetchAudio {
                url,
                audio_format,
                start_time,
                end_time,
                force_keyframes,
            } => Self {
                url: url.clone(),
                video_format: None,
                audio_format: audio_format.clone(),
                range: clip_range(start_time.as_deref(), end_time.as_deref())?,
                force_keyframes: *force_keyframes,
            },
            TaskRequest::FetchLiveVideo {
                url,
                start,
                duration,
                video_format,
                audio_format,
            } => Self {
                url: url.clone(),
                video_format: Some(video_format.clone()),
                audio_format: audio_format.clone(),
                range: Some(live_range(*start, *duration)?),
                force_keyframes: true,
            },
            TaskRequest::FetchLiveAudio {
                url,
                start,
                duration,
                audio_format,
            } => Self {
                url: url.clone(),
                video_format: None,
                audio_format: audio_format.clone(),
                range: Some(live_range(*start, *duration)?),
                force_keyframes: true,
            },
        };
        Ok(Some(plan))
    }

    /// Format selector falling back to the best single file
    fn format(&self) -> String {
        match &self.video_format {
            Some(video) => format!("{video}+{}/best", self.audio_format),
            None => format!("{}/best", self.audio_format),
        }
    }

    fn output_template(&self) -> &'static str {
        if self.video_format.is_some() {
            "video.%(ext)s"
        } else {
            "audio.%(ext)s"
        }
    }

    fn merge_format(&self) -> Option<String> {
        self.video_format.as_ref().map(|_| "mp4".to_string())
    }
}

impl MediaScheduler {
    /// Run one task to a terminal state
    ///
    /// Called with a pool permit held. Engine failures and panics end as
    /// `error` on this task only; the pool keeps running.
    pub(crate) async fn run_task(&self, id: TaskId) {
        let record = match self.store.tasks.mark_processing(id).await {
            Ok(record) => record,
            Err(e) => {
                // removed or already picked up
                tracing::debug!(task_id = %id, error = %e, "skipping dispatch");
                return;
            }
        };

        tracing::info!(task_id = %id, task_type = record.request.task_type(), "task started");
        self.emit_event(Event::Started { id });

        let (progress_tx, mut progress_rx) = mpsc::unbounded_channel::<f32>();
        let writer = {
            let scheduler = self.clone();
            tokio::spawn(async move {
                while let Some(percent) = progress_rx.recv().await {
                    match scheduler.store.tasks.set_progress(id, percent).await {
                        Ok(true) => scheduler.emit_event(Event::Progress {
                            id,
                            percent: percent.clamp(0.0, 100.0),
                        }),
                        Ok(false) => {}
                        Err(e) => {
                            tracing::warn!(task_id = %id, error = %e, "failed to record progress")
                        }
                    }
                }
            })
        };

        let execution = {
            let scheduler = self.clone();
            tokio::spawn(async move { scheduler.execute(record, progress_tx).await })
        };

        let outcome = match execution.await {
            Ok(outcome) => outcome,
            Err(join_error) => Err(Error::Other(format!("task panicked: {join_error}"))),
        };

        // sender is gone once execute returns, so the writer drains and exits
        if let Err(e) = writer.await {
            tracing::warn!(task_id = %id, error = %e, "progress writer failed");
        }

        match outcome {
            Ok(file) => match self.store.tasks.complete(id, file.clone()).await {
                Ok(_) => {
                    tracing::info!(task_id = %id, file = %file, "task completed");
                    self.emit_event(Event::Completed { id, file });
                }
                Err(e) => tracing::error!(task_id = %id, error = %e, "failed to record completion"),
            },
            Err(error) => {
                let message = error.to_string();
                tracing::warn!(task_id = %id, error = %message, "task failed");
                match self.store.tasks.fail(id, message.clone()).await {
                    Ok(_) => self.emit_event(Event::Failed { id, error: message }),
                    Err(e) => {
                        tracing::error!(task_id = %id, error = %e, "failed to record failure")
                    }
                }
            }
        }
    }

    /// Perform the fetch and return the artifact path relative to the download root
    async fn execute(&self, record: TaskRecord, progress: mpsc::UnboundedSender<f32>) -> Result<String> {
        let id = record.id;
        let root = self.config.download_dir().clone();
        let dir = task_dir(&root, id);
        let proxy = record
            .proxy
            .clone()
            .or_else(|| self.config.download.default_proxy.clone());

        let Some(plan) = MediaPlan::from_request(&record.request)? else {
            let info = self
                .engine
                .fetch_metadata(record.request.url(), proxy.as_deref())
                .await?;
            tokio::fs::create_dir_all(&dir).await?;
            tokio::fs::write(dir.join(INFO_FILE_NAME), serde_json::to_vec_pretty(&info)?).await?;
            return Ok(format!("{id}/{INFO_FILE_NAME}"));
        };

        let estimate = self
            .engine
            .estimate_size(
                &plan.url,
                plan.video_format.as_deref(),
                Some(&plan.audio_format),
                plan.range,
                proxy.as_deref(),
            )
            .await?;
        let size = match estimate {
            Some(size) if size > 0 => size,
            _ => {
                return Err(Error::SizeEstimationFailed(format!(
                    "no size information for {}",
                    plan.url
                )));
            }
        };
        let reserved = size.saturating_add(size / SIZE_INFLATION_DIVISOR);
        self.admission
            .reserve_memory(&record.key_name, reserved, Utc::now())
            .await?;
        tracing::debug!(task_id = %id, estimated = size, reserved, "memory reserved");

        tokio::fs::create_dir_all(&dir).await?;
        let callback: ProgressCallback = Arc::new(move |percent| {
            progress.send(percent).ok();
        });
        let request = MediaRequest {
            url: plan.url.clone(),
            format: plan.format(),
            output_dir: dir.clone(),
            output_template: plan.output_template().to_string(),
            merge_format: plan.merge_format(),
            proxy,
            range: plan.range,
            force_keyframes: plan.force_keyframes,
        };
        self.engine.fetch_media(request, callback).await?;

        let file = first_file_name(&dir).await?.ok_or_else(|| {
            Error::ExtractionFailed("engine finished without producing a file".into())
        })?;
        Ok(format!("{id}/{file}"))
    }
}
