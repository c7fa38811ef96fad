//! Persistence layer for media-dl
//!
//! Keys and tasks live in two whole documents held by a [`DocumentStore`].
//! Every access goes through a [`Registry`], which serializes
//! load/mutate/save cycles behind an async mutex.
//!
//! ## Submodules
//!
//! - [`json`]: one JSON file per document, replaced atomically
//! - [`sqlite`]: one row per document in SQLite
//! - [`registry`]: typed, transactional access to one document
//! - `tasks`: task state machine transitions on the task registry
//! - `keys`: token lookup on the key registry

use crate::config::PersistenceConfig;
use crate::error::Result;
use crate::types::{KeyRecord, TaskId, TaskRecord};
use async_trait::async_trait;
use std::sync::Arc;

pub mod json;
pub mod registry;
pub mod sqlite;

mod keys;
mod tasks;

pub use json::JsonFileStore;
pub use registry::Registry;
pub use sqlite::SqliteStore;
pub use tasks::INTERRUPTED_MESSAGE;

/// Name of the key registry document
pub const KEYS_DOCUMENT: &str = "keys";

/// Name of the task registry document
pub const TASKS_DOCUMENT: &str = "tasks";

/// Whole-document storage with atomic load/replace semantics
///
/// A reader never observes a partially written document.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Load a document, `None` if it was never saved
    async fn load(&self, name: &str) -> Result<Option<String>>;

    /// Replace a document
    async fn save(&self, name: &str, body: &str) -> Result<()>;

    /// Backend name for logging
    fn name(&self) -> &'static str;
}

/// Registry of API keys, by key name
pub type KeyRegistry = Registry<String, KeyRecord>;

/// Registry of tasks, by task id
pub type TaskRegistry = Registry<TaskId, TaskRecord>;

/// Both registries over one backend
#[derive(Clone)]
pub struct Store {
    /// Key registry
    pub keys: Arc<KeyRegistry>,
    /// Task registry
    pub tasks: Arc<TaskRegistry>,
}

impl Store {
    /// Build both registries over an existing backend
    pub fn new(backend: Arc<dyn DocumentStore>) -> Self {
        Self {
            keys: Arc::new(Registry::new(KEYS_DOCUMENT, backend.clone())),
            tasks: Arc::new(Registry::new(TASKS_DOCUMENT, backend)),
        }
    }

    /// Open the backend selected by configuration
    pub async fn open(config: &PersistenceConfig) -> Result<Self> {
        let backend: Arc<dyn DocumentStore> = match config {
            PersistenceConfig::Json { dir } => Arc::new(JsonFileStore::new(dir).await?),
            PersistenceConfig::Sqlite { path } => Arc::new(SqliteStore::new(path).await?),
        };
        tracing::info!(backend = backend.name(), "document store opened");
        Ok(Self::new(backend))
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;
