//! Retention and orphan sweeps.

use crate::error::Result;
use crate::types::{Event, TaskId};
use crate::utils::task_dir;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use std::path::Path;

use super::MediaScheduler;

impl MediaScheduler {
    /// Remove terminal tasks older than the retention window
    ///
    /// A task expires once strictly more than `task_retention` has passed since
    /// it reached its terminal state. Records are dropped in a single registry
    /// write; artifact directories are removed afterwards, and a directory that
    /// cannot be removed is left for the orphan sweep.
    pub async fn sweep_expired(&self, now: DateTime<Utc>) -> Result<Vec<TaskId>> {
        let retention = chrono::Duration::from_std(self.config.retention.task_retention)
            .unwrap_or_else(|_| chrono::Duration::MAX);

        let expired = self
            .store
            .tasks
            .transact(move |tasks| {
                let expired: Vec<TaskId> = tasks
                    .values()
                    .filter(|record| record.status.is_terminal())
                    .filter(|record| {
                        let finished = record.completed_at.unwrap_or(record.created_at);
                        now.signed_duration_since(finished) > retention
                    })
                    .map(|record| record.id)
                    .collect();
                for id in &expired {
                    tasks.remove(id);
                }
                Ok(expired)
            })
            .await?;

        let root = self.config.download_dir();
        for id in &expired {
            remove_dir_if_present(&task_dir(root, id)).await;
            tracing::debug!(task_id = %id, "expired task removed");
            self.emit_event(Event::Removed { id: *id });
        }
        if !expired.is_empty() {
            tracing::info!(count = expired.len(), "retention sweep removed tasks");
        }

        Ok(expired)
    }

    /// Delete artifact directories that no task record references
    ///
    /// Safe to run repeatedly; returns how many directories were removed.
    /// Failures are logged, never propagated.
    pub async fn sweep_orphans(&self) -> usize {
        let root = self.config.download_dir().clone();

        // list before loading the registry so a task admitted in between is
        // seen as live rather than orphaned
        let dirs = match list_dirs(&root).await {
            Ok(dirs) => dirs,
            Err(e) => {
                tracing::warn!(dir = %root.display(), error = %e, "failed to list download directory");
                return 0;
            }
        };
        if dirs.is_empty() {
            return 0;
        }

        let live: HashSet<String> = match self.store.tasks.snapshot().await {
            Ok(tasks) => tasks.keys().map(|id| id.to_string()).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "orphan sweep skipped, task registry unavailable");
                return 0;
            }
        };

        let mut removed = 0;
        for name in dirs {
            if live.contains(&name) {
                continue;
            }
            if remove_dir_if_present(&root.join(&name)).await {
                removed += 1;
            }
        }
        if removed > 0 {
            tracing::info!(count = removed, "orphan sweep removed directories");
        }
        removed
    }
}

async fn list_dirs(root: &Path) -> std::io::Result<Vec<String>> {
    let mut entries = match tokio::fs::read_dir(root).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(e),
    };

    let mut dirs = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            dirs.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    Ok(dirs)
}

/// Returns whether a directory was actually removed
async fn remove_dir_if_present(dir: &Path) -> bool {
    match tokio::fs::remove_dir_all(dir).await {
        Ok(()) => true,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => false,
        Err(e) => {
            tracing::warn!(dir = %dir.display(), error = %e, "failed to remove task directory");
            false
        }
    }
}
