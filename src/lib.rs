//! # media-dl
//!
//! Multi-tenant media retrieval scheduler.
//!
//! Clients holding an API key submit fetch tasks (video, audio, metadata, live
//! recordings). Every submission passes an admission gate that enforces
//! authentication, permissions, a per-key request ceiling and a rolling memory
//! quota. A dispatcher hands admitted tasks to a bounded worker pool, which
//! drives an [`ExtractionEngine`](engine::ExtractionEngine) and records the
//! outcome on the task.
//!
//! ## Design Philosophy
//!
//! - **Registry is the source of truth** - task and key state lives in
//!   persisted documents, so a restart recovers from whatever was on disk
//! - **Sensible defaults** - works out of the box with zero configuration
//! - **Event-driven** - consumers subscribe to task events, no polling required
//!
//! ## Quick Start
//!
//! ```no_run
//! use media_dl::{Config, MediaScheduler, TaskRequest};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let scheduler = MediaScheduler::new(Config::default()).await?;
//!     scheduler.start().await?;
//!
//!     // Subscribe to events
//!     let mut events = scheduler.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     let task = scheduler
//!         .submit_task(
//!             Some("my-api-key"),
//!             TaskRequest::FetchInfo { url: "https://example.com/watch?v=abc".into() },
//!             None,
//!         )
//!         .await?;
//!     println!("queued {}", task.id);
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// Authentication, permissions and per-key quotas
pub mod admission;
/// REST API module
pub mod api;
/// Configuration types
pub mod config;
/// Media extraction engines
pub mod engine;
/// Error types
pub mod error;
/// Dispatcher, worker pool and task lifecycle (decomposed into focused submodules)
pub mod scheduler;
/// Key and task registries over a document store
pub mod store;
/// Core types and events
pub mod types;
/// Utility functions
pub mod utils;

// Re-export commonly used types
pub use admission::{AdmissionController, Decision, DenyReason};
pub use config::Config;
pub use engine::{ExtractionEngine, MediaRequest, NoOpEngine, ProgressCallback, YtDlpEngine};
pub use error::{ApiError, DatabaseError, Error, ErrorDetail, Result, ToHttpStatus};
pub use scheduler::MediaScheduler;
pub use store::{DocumentStore, JsonFileStore, SqliteStore, Store};
pub use types::{
    Event, KeyInfo, KeyRecord, MemorySample, Permission, TaskId, TaskRecord, TaskRequest,
    TaskStatus, TimeRange,
};

/// Helper function to run the scheduler with graceful signal handling.
///
/// Waits for a termination signal and then calls the scheduler's `shutdown()` method.
///
/// - **Unix:** listens for SIGTERM and SIGINT, with fallbacks if signal registration fails.
/// - **Windows/other:** listens for Ctrl+C via `tokio::signal::ctrl_c()`.
///
/// # Example
///
/// ```no_run
/// use media_dl::{Config, MediaScheduler, run_with_shutdown};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let scheduler = MediaScheduler::new(Config::default()).await?;
///     scheduler.start().await?;
///
///     // Run with automatic signal handling
///     run_with_shutdown(scheduler).await?;
///
///     Ok(())
/// }
/// ```
pub async fn run_with_shutdown(scheduler: MediaScheduler) -> Result<()> {
    wait_for_signal().await;
    scheduler.shutdown().await
}

#[cfg(unix)]
async fn wait_for_signal() {
    use tokio::signal::unix::{SignalKind, signal};

    // Registration may fail in restricted environments (containers, tests)
    let sigterm_result = signal(SignalKind::terminate());
    let sigint_result = signal(SignalKind::interrupt());

    match (sigterm_result, sigint_result) {
        (Ok(mut sigterm), Ok(mut sigint)) => {
            tokio::select! {
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM signal");
                }
                _ = sigint.recv() => {
                    tracing::info!("Received SIGINT signal (Ctrl+C)");
                }
            }
        }
        (Err(e), _) => {
            tracing::warn!(error = %e, "Could not register SIGTERM handler, waiting for SIGINT only");
            if let Ok(mut sigint) = signal(SignalKind::interrupt()) {
                sigint.recv().await;
                tracing::info!("Received SIGINT signal (Ctrl+C)");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
        (_, Err(e)) => {
            tracing::warn!(error = %e, "Could not register SIGINT handler, waiting for SIGTERM only");
            if let Ok(mut sigterm) = signal(SignalKind::terminate()) {
                sigterm.recv().await;
                tracing::info!("Received SIGTERM signal");
            } else {
                tracing::error!("Could not register any signal handlers, using ctrl_c fallback");
                tokio::signal::ctrl_c().await.ok();
            }
        }
    }
}

#[cfg(not(unix))]
async fn wait_for_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => {
            tracing::info!("Received Ctrl+C signal");
        }
        Err(e) => {
            tracing::error!(error = %e, "Failed to listen for Ctrl+C signal");
        }
    }
}
