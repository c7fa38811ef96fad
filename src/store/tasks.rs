//! Task state machine transitions.

use crate::types::{TaskId, TaskRecord, TaskStatus};
use crate::{Error, Result};
use chrono::{DateTime, Utc};

use super::TaskRegistry;

/// Error recorded on tasks found `processing` at startup
pub const INTERRUPTED_MESSAGE: &str = "Task was interrupted during processing";

/// Check a transition and fail with [`Error::InvalidTransition`] if the state
/// machine forbids it
fn check_transition(record: &TaskRecord, to: TaskStatus) -> Result<()> {
    if record.status.can_transition_to(to) {
        Ok(())
    } else {
        Err(Error::InvalidTransition {
            id: record.id,
            from: record.status,
            to,
        })
    }
}

impl TaskRegistry {
    /// Move a task from `waiting` to `processing`
    pub async fn mark_processing(&self, id: TaskId) -> Result<TaskRecord> {
        self.update(&id, |record| {
            check_transition(record, TaskStatus::Processing)?;
            record.status = TaskStatus::Processing;
            record.progress = Some(0.0);
            Ok(record.clone())
        })
        .await?
        .ok_or(Error::TaskNotFound(id))
    }

    /// Record progress on a `processing` task
    ///
    /// Values are clamped to `0..=100` and never move backwards. Returns
    /// whether the stored value advanced; a missing or non-processing task is
    /// left untouched.
    pub async fn set_progress(&self, id: TaskId, percent: f32) -> Result<bool> {
        let percent = if percent.is_finite() {
            percent.clamp(0.0, 100.0)
        } else {
            return Ok(false);
        };

        let applied = self
            .update(&id, |record| {
                if record.status != TaskStatus::Processing {
                    return Ok(false);
                }
                let current = record.progress.unwrap_or(0.0);
                if percent <= current {
                    return Ok(false);
                }
                record.progress = Some(percent);
                Ok(true)
            })
            .await?;
        Ok(applied.unwrap_or(false))
    }

    /// Move a task from `processing` to `completed` with its result artifact
    pub async fn complete(&self, id: TaskId, file: String) -> Result<TaskRecord> {
        self.update(&id, |record| {
            check_transition(record, TaskStatus::Completed)?;
            record.status = TaskStatus::Completed;
            record.progress = Some(100.0);
            record.file = Some(file);
            record.error = None;
            record.completed_at = Some(Utc::now());
            Ok(record.clone())
        })
        .await?
        .ok_or(Error::TaskNotFound(id))
    }

    /// Move a task from `processing` to `error` with a failure description
    pub async fn fail(&self, id: TaskId, message: String) -> Result<TaskRecord> {
        self.update(&id, |record| {
            check_transition(record, TaskStatus::Error)?;
            record.status = TaskStatus::Error;
            record.file = None;
            record.error = Some(message);
            record.completed_at = Some(Utc::now());
            Ok(record.clone())
        })
        .await?
        .ok_or(Error::TaskNotFound(id))
    }

    /// Reclassify every `processing` task as `error`
    ///
    /// Run once at startup, before the dispatcher's first tick. Returns the
    /// ids that were reclassified.
    pub async fn recover_interrupted(&self, now: DateTime<Utc>) -> Result<Vec<TaskId>> {
        self.transact(|records| {
            let mut recovered = Vec::new();
            for record in records.values_mut() {
                if record.status == TaskStatus::Processing {
                    record.status = TaskStatus::Error;
                    record.progress = None;
                    record.file = None;
                    record.error = Some(INTERRUPTED_MESSAGE.to_string());
                    record.completed_at = Some(now);
                    recovered.push(record.id);
                }
            }
            Ok(recovered)
        })
        .await
    }

    /// Number of live records owned by a key
    pub async fn count_owned_by(&self, key_name: &str) -> Result<usize> {
        let records = self.snapshot().await?;
        Ok(records
            .values()
            .filter(|record| record.key_name == key_name)
            .count())
    }
}
