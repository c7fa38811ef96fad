//! Core scheduler implementation split into focused submodules.
//!
//! The `MediaScheduler` struct and its methods are organized by domain:
//! - [`submit`] - Admission of new tasks and task lookup
//! - [`dispatcher`] - Periodic loop promoting waiting tasks into the worker pool
//! - [`worker`] - Task execution against the extraction engine
//! - [`cleanup`] - Retention and orphan sweeps
//! - [`lifecycle`] - Startup recovery and shutdown coordination

mod cleanup;
mod dispatcher;
mod lifecycle;
mod submit;
mod worker;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::admission::AdmissionController;
use crate::config::Config;
use crate::engine::{ExtractionEngine, engine_from_config};
use crate::error::{Error, Result};
use crate::store::Store;
use crate::types::{Event, TaskId};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use tokio::sync::{Mutex, Semaphore, broadcast};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Worker pool and dispatcher state
#[derive(Clone)]
pub(crate) struct PoolState {
    /// Semaphore bounding concurrent task execution (`max_workers` permits)
    pub(crate) concurrent_limit: Arc<Semaphore>,
    /// Tasks handed to the pool that have not finished yet
    pub(crate) in_flight: Arc<Mutex<HashSet<TaskId>>>,
    /// Whether new submissions are accepted (false once shutdown begins)
    pub(crate) accepting_new: Arc<AtomicBool>,
    /// Whether `start()` has run
    pub(crate) started: Arc<AtomicBool>,
    /// Stops the dispatcher loop and any task still waiting for a permit
    pub(crate) cancel: CancellationToken,
    /// Dispatcher loop handle, joined on shutdown
    pub(crate) dispatcher: Arc<Mutex<Option<JoinHandle<()>>>>,
}

impl PoolState {
    fn new(max_workers: usize) -> Self {
        Self {
            concurrent_limit: Arc::new(Semaphore::new(max_workers)),
            in_flight: Arc::new(Mutex::new(HashSet::new())),
            accepting_new: Arc::new(AtomicBool::new(true)),
            started: Arc::new(AtomicBool::new(false)),
            cancel: CancellationToken::new(),
            dispatcher: Arc::new(Mutex::new(None)),
        }
    }
}

/// Main scheduler instance (cloneable - all fields are Arc-wrapped)
#[derive(Clone)]
pub struct MediaScheduler {
    /// Key and task registries
    /// Public for integration tests to inspect task records
    pub store: Store,
    /// Admission controller (auth, permissions, quotas, key management)
    pub(crate) admission: AdmissionController,
    /// Extraction engine (trait object for pluggable implementations)
    pub(crate) engine: Arc<dyn ExtractionEngine>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: Arc<Config>,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: broadcast::Sender<Event>,
    /// Worker pool and dispatcher state
    pub(crate) pool: PoolState,
}

impl MediaScheduler {
    /// Create a new MediaScheduler instance
    ///
    /// Creates the artifact root, opens the configured document store and
    /// picks the extraction engine from `config.tools`. Nothing runs until
    /// [`start`](Self::start) is called.
    pub async fn new(config: Config) -> Result<Self> {
        let engine = engine_from_config(&config.tools);
        Self::with_engine(config, engine).await
    }

    /// Create a scheduler with an explicit extraction engine
    pub async fn with_engine(config: Config, engine: Arc<dyn ExtractionEngine>) -> Result<Self> {
        config.validate()?;
        let store = Store::open(&config.persistence).await?;
        Self::with_store(config, store, engine).await
    }

    /// Create a scheduler over an existing store
    pub async fn with_store(
        config: Config,
        store: Store,
        engine: Arc<dyn ExtractionEngine>,
    ) -> Result<Self> {
        tokio::fs::create_dir_all(&config.download.download_dir)
            .await
            .map_err(|e| {
                Error::Io(std::io::Error::new(
                    e.kind(),
                    format!(
                        "Failed to create download directory '{}': {}",
                        config.download.download_dir.display(),
                        e
                    ),
                ))
            })?;

        let admission =
            AdmissionController::new(store.clone(), config.quota.clone(), &config.retention);

        // Buffer of 1000 events; slow subscribers see RecvError::Lagged
        let (event_tx, _rx) = broadcast::channel(1000);

        tracing::info!(
            engine = engine.name(),
            max_workers = config.workers.max_workers,
            "Media scheduler initialized"
        );

        Ok(Self {
            store,
            admission,
            engine,
            pool: PoolState::new(config.workers.max_workers),
            config: Arc::new(config),
            event_tx,
        })
    }

    /// Subscribe to task events
    ///
    /// Multiple subscribers are supported. Each subscriber receives all events independently.
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use media_dl::{Config, MediaScheduler};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let scheduler = MediaScheduler::new(Config::default()).await?;
    ///
    ///     let mut events = scheduler.subscribe();
    ///     tokio::spawn(async move {
    ///         while let Ok(event) = events.recv().await {
    ///             tracing::info!(?event, "task event");
    ///         }
    ///     });
    ///
    ///     scheduler.start().await?;
    ///     Ok(())
    /// }
    /// ```
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Admission controller, for key management
    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    /// Get the current configuration
    pub fn get_config(&self) -> Arc<Config> {
        Arc::clone(&self.config)
    }

    /// Name of the extraction engine in use
    pub fn engine_name(&self) -> &'static str {
        self.engine.name()
    }

    /// Emit an event to all subscribers
    ///
    /// Dropped silently when nobody is listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }

    /// Spawn the REST API server in a background task
    pub fn spawn_api_server(&self) -> JoinHandle<Result<()>> {
        let scheduler = Arc::new(self.clone());
        let config = self.config.clone();

        tokio::spawn(async move { crate::api::start_api_server(scheduler, config).await })
    }
}
