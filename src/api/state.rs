//! Application state for the API server

use crate::{Config, MediaScheduler};
use std::sync::Arc;

/// Shared application state accessible to all route handlers
///
/// Cloned for each request (cheap Arc clone).
#[derive(Clone)]
pub struct AppState {
    /// The scheduler handling submissions, lookups and key management
    pub scheduler: Arc<MediaScheduler>,

    /// Configuration (read-only)
    pub config: Arc<Config>,
}

impl AppState {
    /// Create a new AppState
    pub fn new(scheduler: Arc<MediaScheduler>, config: Arc<Config>) -> Self {
        Self { scheduler, config }
    }
}
