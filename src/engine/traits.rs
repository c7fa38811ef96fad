//! Traits and types for media extraction

use crate::types::TimeRange;
use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::Arc;

/// Receives download progress as a percentage (0.0 to 100.0)
///
/// Invoked from whatever task drives the engine, possibly many times per
/// second.
pub type ProgressCallback = Arc<dyn Fn(f32) + Send + Sync>;

/// Everything an engine needs to download one media artifact
#[derive(Debug, Clone, PartialEq)]
pub struct MediaRequest {
    /// Source locator
    pub url: String,
    /// Format selector (e.g. `bestvideo+bestaudio/best`)
    pub format: String,
    /// Directory the artifact is written into
    pub output_dir: PathBuf,
    /// File name template inside `output_dir` (e.g. `video.%(ext)s`)
    pub output_template: String,
    /// Container to merge separate streams into
    pub merge_format: Option<String>,
    /// Network route (proxy URL)
    pub proxy: Option<String>,
    /// Half-open interval to download instead of the whole source
    pub range: Option<TimeRange>,
    /// Re-encode around cut points so clips start on a keyframe
    pub force_keyframes: bool,
}

/// Trait for media inspection and download
///
/// Implementations can drive external binaries or provide stub
/// functionality for graceful degradation.
#[async_trait]
pub trait ExtractionEngine: Send + Sync {
    /// Estimate the combined size in bytes of the selected formats
    ///
    /// `range` restricts the estimate to the part that will be downloaded;
    /// sources without a known duration (live streams) need it to be
    /// estimable. Returns `Ok(None)` when the source exposes no usable size
    /// information. The estimate is raw; callers add their own safety margin.
    async fn estimate_size(
        &self,
        url: &str,
        video_format: Option<&str>,
        audio_format: Option<&str>,
        range: Option<TimeRange>,
        proxy: Option<&str>,
    ) -> crate::Result<Option<u64>>;

    /// Fetch the metadata document for a source
    async fn fetch_metadata(&self, url: &str, proxy: Option<&str>)
    -> crate::Result<serde_json::Value>;

    /// Download media into `request.output_dir`
    ///
    /// Returns the directory the artifact was written into.
    async fn fetch_media(
        &self,
        request: MediaRequest,
        progress: ProgressCallback,
    ) -> crate::Result<PathBuf>;

    /// Human-readable name for logging
    fn name(&self) -> &'static str;
}
