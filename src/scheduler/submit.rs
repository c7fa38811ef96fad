//! Task admission and lookup.

use crate::error::{Error, Result};
use crate::types::{Event, TaskId, TaskRecord, TaskRequest};
use crate::utils::{clip_range, live_range, validate_proxy, validate_url};
use chrono::Utc;
use std::sync::atomic::Ordering;

use super::MediaScheduler;

impl MediaScheduler {
    /// Admit a new task
    ///
    /// Runs the admission gate for the request's permission, validates the
    /// request, checks the key's memory quota with a zero-byte reservation, and
    /// inserts the record as `waiting`. The rate ceiling is re-checked inside
    /// the insert so concurrent submissions cannot overshoot it.
    ///
    /// Nothing is recorded when admission fails.
    pub async fn submit_task(
        &self,
        token: Option<&str>,
        request: TaskRequest,
        proxy: Option<String>,
    ) -> Result<TaskRecord> {
        if !self.pool.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let key = self
            .admission
            .gate(token, request.required_permission())
            .await?
            .into_result()?;

        validate_request(&request)?;
        let proxy = proxy.filter(|p| !p.trim().is_empty());
        if let Some(proxy) = &proxy {
            validate_proxy(proxy)?;
        }

        self.admission
            .reserve_memory(&key.name, 0, Utc::now())
            .await?;

        let record = TaskRecord::new(key.name.clone(), request, proxy);
        let admission = self.admission.clone();
        let inserted = record.clone();
        self.store
            .tasks
            .transact(move |tasks| {
                admission
                    .check_rate_in(tasks, &inserted.key_name)
                    .map_err(Error::from)?;
                tasks.insert(inserted.id, inserted);
                Ok(())
            })
            .await?;

        tracing::info!(
            task_id = %record.id,
            key = %record.key_name,
            task_type = record.request.task_type(),
            "task queued"
        );
        self.emit_event(Event::Queued {
            id: record.id,
            task_type: record.request.task_type().to_string(),
        });

        Ok(record)
    }

    /// Current state of a task
    pub async fn get_task(&self, id: TaskId) -> Result<TaskRecord> {
        self.store
            .tasks
            .get(&id)
            .await?
            .ok_or(Error::TaskNotFound(id))
    }
}

/// Reject requests the worker could never execute
pub(crate) fn validate_request(request: &TaskRequest) -> Result<()> {
    validate_url(request.url())?;

    match request {
        TaskRequest::FetchVideo {
            video_format,
            audio_format,
            start_time,
            end_time,
            ..
        } => {
            require_selector("video_format", video_format)?;
            require_selector("audio_format", audio_format)?;
            clip_range(start_time.as_deref(), end_time.as_deref())?;
        }
        TaskRequest::FetchAudio {
            audio_format,
            start_time,
            end_time,
            ..
        } => {
            require_selector("audio_format", audio_format)?;
            clip_range(start_time.as_deref(), end_time.as_deref())?;
        }
        TaskRequest::FetchInfo { .. } => {}
        TaskRequest::FetchLiveVideo {
            start,
            duration,
            video_format,
            audio_format,
            ..
        } => {
            require_selector("video_format", video_format)?;
            require_selector("audio_format", audio_format)?;
            live_range(*start, *duration)?;
        }
        TaskRequest::FetchLiveAudio {
            start,
            duration,
            audio_format,
            ..
        } => {
            require_selector("audio_format", audio_format)?;
            live_range(*start, *duration)?;
        }
    }

    Ok(())
}

fn require_selector(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidRequest(format!("{field} must not be empty")));
    }
    Ok(())
}
