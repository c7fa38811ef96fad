//! Helpers for request validation, time ranges and artifact directories

use crate::error::{Error, Result};
use crate::types::TimeRange;
use std::path::{Path, PathBuf};

/// Clip start used when only an end is given
pub const DEFAULT_CLIP_START: &str = "00:00:00";

/// Clip end used when only a start is given
pub const DEFAULT_CLIP_END: &str = "10:00:00";

/// Parse `HH:MM:SS` (seconds may carry a fraction) into seconds
///
/// ```
/// use media_dl::utils::parse_hms;
///
/// assert_eq!(parse_hms("01:02:03.5").unwrap(), 3723.5);
/// assert!(parse_hms("62").is_err());
/// ```
pub fn parse_hms(value: &str) -> Result<f64> {
    let invalid = || Error::InvalidRequest(format!("invalid time '{value}', expected HH:MM:SS"));

    let mut parts = value.trim().split(':');
    let (Some(h), Some(m), Some(s), None) = (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        return Err(invalid());
    };

    let hours: u32 = h.parse().map_err(|_| invalid())?;
    let minutes: u32 = m.parse().map_err(|_| invalid())?;
    let seconds: f64 = s.parse().map_err(|_| invalid())?;
    if minutes >= 60 || !(0.0..60.0).contains(&seconds) {
        return Err(invalid());
    }

    Ok(f64::from(hours) * 3600.0 + f64::from(minutes) * 60.0 + seconds)
}

/// Range for a clipped fetch
///
/// `None` when neither bound is given. A missing start defaults to
/// [`DEFAULT_CLIP_START`] and a missing end to [`DEFAULT_CLIP_END`].
pub fn clip_range(start_time: Option<&str>, end_time: Option<&str>) -> Result<Option<TimeRange>> {
    if start_time.is_none() && end_time.is_none() {
        return Ok(None);
    }

    let start = parse_hms(start_time.unwrap_or(DEFAULT_CLIP_START))?;
    let end = parse_hms(end_time.unwrap_or(DEFAULT_CLIP_END))?;
    if end <= start {
        return Err(Error::InvalidRequest(format!(
            "clip end ({end}s) must be after clip start ({start}s)"
        )));
    }

    Ok(Some(TimeRange { start, end }))
}

/// Range for a live recording: `[start, start + duration)`
pub fn live_range(start: u64, duration: u64) -> Result<TimeRange> {
    if duration == 0 {
        return Err(Error::InvalidRequest(
            "live duration must be greater than zero".into(),
        ));
    }
    let end = start
        .checked_add(duration)
        .ok_or_else(|| Error::InvalidRequest("live range overflows".into()))?;
    Ok(TimeRange {
        start: start as f64,
        end: end as f64,
    })
}

/// Require an absolute http(s) locator
pub fn validate_url(value: &str) -> Result<url::Url> {
    let parsed = url::Url::parse(value)
        .map_err(|e| Error::InvalidRequest(format!("invalid url '{value}': {e}")))?;
    match parsed.scheme() {
        "http" | "https" => Ok(parsed),
        other => Err(Error::InvalidRequest(format!(
            "unsupported url scheme '{other}'"
        ))),
    }
}

/// Require a proxy URL the engine can use
pub fn validate_proxy(value: &str) -> Result<()> {
    url::Url::parse(value)
        .map(|_| ())
        .map_err(|e| Error::InvalidRequest(format!("invalid proxy '{value}': {e}")))
}

/// Whether `name` is a single plain path segment (no separators, no `..`)
pub fn is_plain_file_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains('/')
        && !name.contains('\\')
        && !name.contains('\0')
}

/// Name of the first regular file in `dir`, in name order
pub async fn first_file_name(dir: &Path) -> Result<Option<String>> {
    let mut entries = tokio::fs::read_dir(dir).await?;
    let mut names = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_file() {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    names.sort();
    Ok(names.into_iter().next())
}

/// Directory holding a task's artifacts
pub fn task_dir(root: &Path, id: impl std::fmt::Display) -> PathBuf {
    root.join(id.to_string())
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_hours_minutes_seconds() {
        assert_eq!(parse_hms("00:00:00").unwrap(), 0.0);
        assert_eq!(parse_hms("10:00:00").unwrap(), 36_000.0);
        assert_eq!(parse_hms("00:01:30.25").unwrap(), 90.25);
        assert_eq!(parse_hms(" 100:00:00 ").unwrap(), 360_000.0);
    }

    #[test]
    fn rejects_malformed_times() {
        for bad in ["", "12", "1:2", "00:60:00", "00:00:60", "a:b:c", "00:00:00:00", "-1:00:00"] {
            assert!(parse_hms(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn clip_bounds_default_independently() {
        assert_eq!(clip_range(None, None).unwrap(), None);
        assert_eq!(
            clip_range(Some("00:01:00"), None).unwrap(),
            Some(TimeRange {
                start: 60.0,
                end: 36_000.0
            })
        );
        assert_eq!(
            clip_range(None, Some("00:00:30")).unwrap(),
            Some(TimeRange {
                start: 0.0,
                end: 30.0
            })
        );
    }

    #[test]
    fn empty_or_inverted_clip_is_rejected() {
        assert!(clip_range(Some("00:01:00"), Some("00:01:00")).is_err());
        assert!(clip_range(Some("00:02:00"), Some("00:01:00")).is_err());
    }

    #[test]
    fn live_range_is_half_open_window() {
        assert_eq!(
            live_range(30, 120).unwrap(),
            TimeRange {
                start: 30.0,
                end: 150.0
            }
        );
        assert!(live_range(0, 0).is_err());
        assert!(live_range(u64::MAX, 1).is_err());
    }

    #[test]
    fn only_http_urls_are_accepted() {
        assert!(validate_url("https://example.com/watch?v=abc").is_ok());
        assert!(validate_url("http://example.com").is_ok());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("not a url").is_err());
    }

    #[test]
    fn plain_file_names() {
        assert!(is_plain_file_name("video.mp4"));
        assert!(is_plain_file_name("info.json"));
        assert!(!is_plain_file_name(""));
        assert!(!is_plain_file_name(".."));
        assert!(!is_plain_file_name("../secret"));
        assert!(!is_plain_file_name("a/b"));
        assert!(!is_plain_file_name("a\\b"));
    }

    #[tokio::test]
    async fn first_file_is_chosen_by_name_and_skips_directories() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(first_file_name(dir.path()).await.unwrap(), None);

        std::fs::create_dir(dir.path().join("a-subdir")).unwrap();
        std::fs::write(dir.path().join("video.mp4"), b"v").unwrap();
        std::fs::write(dir.path().join("audio.m4a"), b"a").unwrap();

        assert_eq!(
            first_file_name(dir.path()).await.unwrap().as_deref(),
            Some("audio.m4a")
        );
    }
}
