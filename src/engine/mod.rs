//! Media extraction engines
//!
//! The scheduler never inspects media itself. It asks an [`ExtractionEngine`]
//! for size estimates, metadata documents and downloaded files.
//!
//! ## Architecture
//!
//! - [`YtDlpEngine`]: drives an external `yt-dlp` binary
//! - [`NoOpEngine`]: stub used when no binary is available; every call fails
//!   with [`Error::NotSupported`](crate::Error::NotSupported)
//!
//! ## Usage
//!
//! ```no_run
//! use media_dl::engine::{ExtractionEngine, YtDlpEngine};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let engine = YtDlpEngine::from_path().expect("yt-dlp binary not found");
//!
//!     let size = engine
//!         .estimate_size("https://example.com/watch?v=abc", Some("bestvideo"), Some("bestaudio"), None, None)
//!         .await?;
//!     println!("estimated size: {size:?}");
//!     Ok(())
//! }
//! ```

use crate::config::ToolsConfig;
use std::sync::Arc;

mod cli;
pub mod formats;
mod noop;
mod progress;
mod traits;

pub use cli::YtDlpEngine;
pub use noop::NoOpEngine;
pub use progress::parse_progress_line;
pub use traits::{ExtractionEngine, MediaRequest, ProgressCallback};

/// Pick the engine described by configuration
///
/// Prefers an explicit `yt_dlp_path`, then a PATH search when allowed, and
/// falls back to [`NoOpEngine`].
pub fn engine_from_config(tools: &ToolsConfig) -> Arc<dyn ExtractionEngine> {
    if let Some(path) = &tools.yt_dlp_path {
        tracing::info!(path = %path.display(), "using configured yt-dlp binary");
        return Arc::new(YtDlpEngine::new(path.clone()));
    }

    if tools.search_path
        && let Some(engine) = YtDlpEngine::from_path()
    {
        tracing::info!("found yt-dlp in PATH");
        return Arc::new(engine);
    }

    tracing::warn!("yt-dlp not available, media tasks will fail until it is installed");
    Arc::new(NoOpEngine)
}
