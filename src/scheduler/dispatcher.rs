//! Dispatcher loop: promotes waiting tasks into the worker pool and runs the sweeps.

use crate::error::Result;
use crate::types::{TaskId, TaskStatus};
use chrono::{DateTime, Utc};
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};

use super::MediaScheduler;

impl MediaScheduler {
    /// Start the dispatcher loop
    ///
    /// Every `tick_interval` the loop runs [`tick`](Self::tick); every
    /// `orphan_sweep_interval` it removes orphaned artifact directories. The
    /// loop ends when the pool's cancellation token fires.
    pub(crate) fn spawn_dispatcher(&self) -> JoinHandle<()> {
        let scheduler = self.clone();
        let cancel = self.pool.cancel.clone();
        let tick_period = self.config.retention.tick_interval;
        let orphan_period = self.config.retention.orphan_sweep_interval;

        tokio::spawn(async move {
            let mut ticks = tokio::time::interval(tick_period);
            ticks.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // startup already swept once
            let mut orphan_sweeps =
                tokio::time::interval_at(Instant::now() + orphan_period, orphan_period);
            orphan_sweeps.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = cancel.cancelled() => {
                        tracing::debug!("dispatcher loop stopping");
                        break;
                    }
                    _ = ticks.tick() => {
                        if let Err(e) = scheduler.tick(Utc::now()).await {
                            tracing::warn!(error = %e, "dispatcher tick failed");
                        }
                    }
                    _ = orphan_sweeps.tick() => {
                        scheduler.sweep_orphans().await;
                    }
                }
            }
        })
    }

    /// One dispatcher pass
    ///
    /// 1. Load the task registry
    /// 2. Hand every `waiting` task not already in flight to the worker pool
    /// 3. Remove terminal tasks whose retention window has elapsed
    pub async fn tick(&self, now: DateTime<Utc>) -> Result<()> {
        let tasks = self.store.tasks.snapshot().await?;

        let waiting: Vec<TaskId> = tasks
            .values()
            .filter(|record| record.status == TaskStatus::Waiting)
            .map(|record| record.id)
            .collect();
        for id in waiting {
            self.dispatch(id).await;
        }

        self.sweep_expired(now).await?;
        Ok(())
    }

    /// Hand a task to the worker pool unless it is already in flight
    ///
    /// The spawned job waits for a pool permit, so this never blocks the
    /// dispatcher. Returns whether the task was newly dispatched.
    pub(crate) async fn dispatch(&self, id: TaskId) -> bool {
        {
            let mut in_flight = self.pool.in_flight.lock().await;
            if !in_flight.insert(id) {
                return false;
            }
        }

        let scheduler = self.clone();
        tokio::spawn(async move {
            let semaphore = scheduler.pool.concurrent_limit.clone();
            let permit = tokio::select! {
                permit = semaphore.acquire_owned() => permit.ok(),
                _ = scheduler.pool.cancel.cancelled() => None,
            };

            if let Some(permit) = permit {
                let _permit = permit;
                scheduler.run_task(id).await;
            } else {
                tracing::debug!(task_id = %id, "task left waiting, pool is shutting down");
            }

            scheduler.pool.in_flight.lock().await.remove(&id);
        });

        true
    }
}
