//! No-op engine for graceful degradation

use super::traits::{ExtractionEngine, MediaRequest, ProgressCallback};
use crate::types::TimeRange;
use async_trait::async_trait;
use std::path::PathBuf;

const MISSING_BINARY: &str =
    "media extraction requires the yt-dlp binary. \
     Configure tools.yt_dlp_path or ensure yt-dlp is in PATH.";

/// Engine used when no extraction binary is available
///
/// Every operation fails with `Error::NotSupported`, which the worker records
/// on the task, so the scheduler keeps running without a binary.
pub struct NoOpEngine;

#[async_trait]
impl ExtractionEngine for NoOpEngine {
    async fn estimate_size(
        &self,
        _url: &str,
        _video_format: Option<&str>,
        _audio_format: Option<&str>,
        _range: Option<TimeRange>,
        _proxy: Option<&str>,
    ) -> crate::Result<Option<u64>> {
        Err(crate::Error::NotSupported(MISSING_BINARY.into()))
    }

    async fn fetch_metadata(
        &self,
        _url: &str,
        _proxy: Option<&str>,
    ) -> crate::Result<serde_json::Value> {
        Err(crate::Error::NotSupported(MISSING_BINARY.into()))
    }

    async fn fetch_media(
        &self,
        _request: MediaRequest,
        _progress: ProgressCallback,
    ) -> crate::Result<PathBuf> {
        Err(crate::Error::NotSupported(MISSING_BINARY.into()))
    }

    fn name(&self) -> &'static str {
        "noop"
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[tokio::test]
    async fn every_operation_is_not_supported() {
        let engine = NoOpEngine;

        assert!(matches!(
            engine.estimate_size("u", None, None, None, None).await,
            Err(crate::Error::NotSupported(_))
        ));
        assert!(matches!(
            engine.fetch_metadata("u", None).await,
            Err(crate::Error::NotSupported(_))
        ));

        let request = MediaRequest {
            url: "u".into(),
            format: "bestaudio".into(),
            output_dir: PathBuf::from("/tmp"),
            output_template: "audio.%(ext)s".into(),
            merge_format: None,
            proxy: None,
            range: None,
            force_keyframes: false,
        };
        let result = engine.fetch_media(request, Arc::new(|_| {})).await;
        assert!(matches!(result, Err(crate::Error::NotSupported(_))));
        assert_eq!(engine.name(), "noop");
    }
}
