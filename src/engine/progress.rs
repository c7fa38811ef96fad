//! Parser for yt-dlp progress output

use regex::Regex;
use std::sync::OnceLock;

// pattern is a literal, compilation cannot fail
#[allow(clippy::unwrap_used)]
fn progress_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^\[download\]\s+(\d+(?:\.\d+)?)%").unwrap())
}

/// Extract the percentage from one `--newline` progress line
///
/// ```
/// use media_dl::engine::parse_progress_line;
///
/// assert_eq!(parse_progress_line("[download]  42.5% of ~10.00MiB at 1.00MiB/s"), Some(42.5));
/// assert_eq!(parse_progress_line("[info] Downloading 1 format(s)"), None);
/// ```
pub fn parse_progress_line(line: &str) -> Option<f32> {
    let captures = progress_pattern().captures(line.trim_start())?;
    captures.get(1)?.as_str().parse().ok()
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_download_percentages() {
        assert_eq!(
            parse_progress_line("[download]   0.0% of   12.34MiB at  Unknown B/s ETA Unknown"),
            Some(0.0)
        );
        assert_eq!(
            parse_progress_line("[download] 100% of 12.34MiB in 00:00:03"),
            Some(100.0)
        );
        assert_eq!(
            parse_progress_line("  [download]  73.1% of ~ 5.00MiB at 2.00MiB/s ETA 00:01 (frag 3/9)"),
            Some(73.1)
        );
    }

    #[test]
    fn ignores_other_lines() {
        assert_eq!(parse_progress_line(""), None);
        assert_eq!(
            parse_progress_line("[download] Destination: downloads/abc/video.f137.mp4"),
            None
        );
        assert_eq!(parse_progress_line("[Merger] Merging formats into \"video.mp4\""), None);
        assert_eq!(parse_progress_line("ERROR: 50% of nothing"), None);
    }
}
