//! Startup recovery and graceful shutdown.

use crate::error::{Error, Result};
use crate::types::Event;
use chrono::Utc;
use std::sync::atomic::Ordering;
use std::time::Duration;

use super::MediaScheduler;

/// How long shutdown waits for running tasks
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(30);

/// Poll interval while waiting for running tasks
const SHUTDOWN_POLL: Duration = Duration::from_millis(100);

impl MediaScheduler {
    /// Recover state and start the dispatcher
    ///
    /// In order:
    /// 1. Create the admin key if no key exists (token is logged once)
    /// 2. Mark tasks left `processing` by a previous run as `error`
    /// 3. Remove orphaned artifact directories
    /// 4. Spawn the dispatcher loop
    ///
    /// Recovery finishes before the first dispatcher tick. Calling `start`
    /// twice fails with [`Error::AlreadyStarted`].
    pub async fn start(&self) -> Result<()> {
        if self.pool.started.swap(true, Ordering::SeqCst) {
            return Err(Error::AlreadyStarted);
        }

        self.admission.bootstrap_admin().await?;

        let recovered = self.store.tasks.recover_interrupted(Utc::now()).await?;
        if !recovered.is_empty() {
            tracing::warn!(count = recovered.len(), "marked interrupted tasks as failed");
        }
        for id in recovered {
            self.emit_event(Event::Failed {
                id,
                error: crate::store::INTERRUPTED_MESSAGE.to_string(),
            });
        }

        self.sweep_orphans().await;

        let handle = self.spawn_dispatcher();
        *self.pool.dispatcher.lock().await = Some(handle);

        tracing::info!("scheduler started");
        Ok(())
    }

    /// Gracefully shut down the scheduler
    ///
    /// 1. Stop accepting new submissions
    /// 2. Stop the dispatcher loop (tasks still waiting for a permit stay `waiting`)
    /// 3. Wait up to 30 seconds for running tasks to finish
    /// 4. Emit [`Event::Shutdown`]
    ///
    /// Tasks still running after the timeout are recovered as interrupted on
    /// the next start.
    pub async fn shutdown(&self) -> Result<()> {
        tracing::info!("Initiating graceful shutdown");

        self.pool.accepting_new.store(false, Ordering::SeqCst);
        self.pool.cancel.cancel();

        let dispatcher = self.pool.dispatcher.lock().await.take();
        if let Some(handle) = dispatcher
            && let Err(e) = handle.await
        {
            tracing::warn!(error = %e, "dispatcher loop ended abnormally");
        }

        match tokio::time::timeout(SHUTDOWN_TIMEOUT, self.wait_for_in_flight()).await {
            Ok(()) => tracing::info!("All running tasks completed"),
            Err(_) => {
                let remaining = self.pool.in_flight.lock().await.len();
                tracing::warn!(
                    remaining,
                    "Timeout waiting for running tasks, they will be recovered on next start"
                );
            }
        }

        self.emit_event(Event::Shutdown);
        tracing::info!("Graceful shutdown complete");
        Ok(())
    }

    async fn wait_for_in_flight(&self) {
        loop {
            if self.pool.in_flight.lock().await.is_empty() {
                return;
            }
            tokio::time::sleep(SHUTDOWN_POLL).await;
        }
    }

    /// Whether new submissions are accepted
    pub fn is_accepting(&self) -> bool {
        self.pool.accepting_new.load(Ordering::SeqCst)
    }
}
