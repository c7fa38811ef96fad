//! Size estimation from a yt-dlp metadata document
//!
//! Works on the `formats` array of `yt-dlp -J` output. `bestvideo` and
//! `bestaudio` pick the best video-only / audio-only format; any other
//! selector is looked up by `format_id`.

use crate::types::TimeRange;
use serde_json::Value;
use std::cmp::Ordering;

/// Selector meaning "best video-only format"
pub const BEST_VIDEO: &str = "bestvideo";

/// Selector meaning "best audio-only format"
pub const BEST_AUDIO: &str = "bestaudio";

/// Formats whose bitrate differs by less than this (kbit/s) count as similar
const SIMILAR_ABR_KBPS: f64 = 50.0;

/// Estimate the combined size of a video and an audio selection
///
/// `range` is the part of the source that will be downloaded. Bitrate-based
/// estimates cover only that span, which is also what makes live sources
/// (no `duration`, no declared sizes) estimable at all.
///
/// Returns `None` when neither selection yields a positive size.
pub fn estimate_size(
    info: &Value,
    video_format: Option<&str>,
    audio_format: Option<&str>,
    range: Option<TimeRange>,
) -> Option<u64> {
    let formats = info
        .get("formats")
        .and_then(Value::as_array)
        .map(Vec::as_slice)
        .unwrap_or_default();
    let duration = covered_seconds(number(info, "duration"), range);

    let mut total = 0u64;
    if let Some(selector) = video_format {
        total = total.saturating_add(selection_size(formats, duration, selector, Kind::Video));
    }
    if let Some(selector) = audio_format {
        total = total.saturating_add(selection_size(formats, duration, selector, Kind::Audio));
    }

    (total > 0).then_some(total)
}

/// Seconds of media a download of `range` yields
///
/// A known source duration caps the range; without one the range length is
/// taken as is.
fn covered_seconds(source_duration: f64, range: Option<TimeRange>) -> f64 {
    let Some(range) = range else {
        return source_duration;
    };
    let end = if source_duration > 0.0 {
        range.end.min(source_duration)
    } else {
        range.end
    };
    (end - range.start).max(0.0)
}

#[derive(Clone, Copy, PartialEq)]
enum Kind {
    Video,
    Audio,
}

fn selection_size(formats: &[Value], duration: f64, selector: &str, kind: Kind) -> u64 {
    let best = match kind {
        Kind::Video => BEST_VIDEO,
        Kind::Audio => BEST_AUDIO,
    };

    if selector != best {
        return formats
            .iter()
            .find(|f| f.get("format_id").and_then(Value::as_str) == Some(selector))
            .map(declared_size)
            .unwrap_or(0);
    }

    let candidates: Vec<&Value> = formats
        .iter()
        .filter(|f| match kind {
            Kind::Video => codec(f, "vcodec") && !codec(f, "acodec"),
            Kind::Audio => codec(f, "acodec") && !codec(f, "vcodec"),
        })
        .collect();
    best_format_size(formats, &candidates, duration, kind)
}

/// Size of the best candidate
///
/// Prefers candidates that declare a size. Otherwise estimates from the best
/// candidate's total bitrate and the duration, and finally borrows the largest
/// declared size among similar formats.
fn best_format_size(formats: &[Value], candidates: &[&Value], duration: f64, kind: Kind) -> u64 {
    let with_size: Vec<&Value> = candidates
        .iter()
        .copied()
        .filter(|f| declared_size(f) > 0)
        .collect();
    if let Some(best) = best_of(&with_size, kind) {
        return declared_size(best);
    }

    let Some(best) = best_of(candidates, kind) else {
        return 0;
    };

    let tbr = number(best, "tbr");
    if tbr > 0.0 && duration > 0.0 {
        // tbr is kbit/s
        return (tbr * 1000.0 / 8.0 * duration) as u64;
    }

    formats
        .iter()
        .filter(|f| match kind {
            Kind::Video => number(f, "height") == number(best, "height"),
            Kind::Audio => (number(f, "abr") - number(best, "abr")).abs() < SIMILAR_ABR_KBPS,
        })
        .map(declared_size)
        .max()
        .unwrap_or(0)
}

fn best_of<'a>(candidates: &[&'a Value], kind: Kind) -> Option<&'a Value> {
    candidates.iter().copied().max_by(|a, b| rank(a, b, kind))
}

fn rank(a: &Value, b: &Value, kind: Kind) -> Ordering {
    match kind {
        Kind::Video => number(a, "height")
            .total_cmp(&number(b, "height"))
            .then(number(a, "tbr").total_cmp(&number(b, "tbr"))),
        Kind::Audio => audio_rate(a).total_cmp(&audio_rate(b)),
    }
}

fn audio_rate(format: &Value) -> f64 {
    let abr = number(format, "abr");
    if abr > 0.0 { abr } else { number(format, "tbr") }
}

/// `filesize`, falling back to `filesize_approx`
fn declared_size(format: &Value) -> u64 {
    let exact = number(format, "filesize");
    let size = if exact > 0.0 {
        exact
    } else {
        number(format, "filesize_approx")
    };
    if size > 0.0 { size as u64 } else { 0 }
}

/// Whether a codec field names an actual codec (absent counts as present)
fn codec(format: &Value, field: &str) -> bool {
    format.get(field).and_then(Value::as_str) != Some("none")
}

fn number(value: &Value, field: &str) -> f64 {
    value.get(field).and_then(Value::as_f64).unwrap_or(0.0)
}
