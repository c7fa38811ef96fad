//! CLI-based engine using an external yt-dlp binary

use super::formats;
use super::progress::parse_progress_line;
use super::traits::{ExtractionEngine, MediaRequest, ProgressCallback};
use crate::Error;
use crate::types::TimeRange;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncReadExt, BufReader};
use tokio::process::Command;

/// Number of trailing stderr lines kept for error messages
const STDERR_TAIL_LINES: usize = 5;

/// Engine driving an external `yt-dlp` binary
///
/// Metadata and size estimates come from `yt-dlp -J`; downloads run with
/// `--newline` so progress can be read line by line from stdout.
///
/// # Examples
///
/// ```no_run
/// use media_dl::engine::{ExtractionEngine, YtDlpEngine};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let engine = YtDlpEngine::from_path().expect("yt-dlp not found in PATH");
/// let info = engine.fetch_metadata("https://example.com/watch?v=abc", None).await?;
/// println!("title: {}", info["title"]);
/// # Ok(())
/// # }
/// ```
pub struct YtDlpEngine {
    binary_path: PathBuf,
}

impl YtDlpEngine {
    /// Create an engine with an explicit binary path
    pub fn new(binary_path: PathBuf) -> Self {
        Self { binary_path }
    }

    /// Attempt to find yt-dlp in PATH
    pub fn from_path() -> Option<Self> {
        which::which("yt-dlp").ok().map(Self::new)
    }

    /// Arguments for a metadata dump
    fn metadata_args(url: &str, proxy: Option<&str>) -> Vec<String> {
        let mut args = vec![
            "-J".to_string(),
            "--no-warnings".to_string(),
            "--skip-download".to_string(),
            "--flat-playlist".to_string(),
        ];
        if let Some(proxy) = proxy {
            args.push("--proxy".into());
            args.push(proxy.into());
        }
        args.push("--".into());
        args.push(url.into());
        args
    }

    /// Arguments for a download
    fn download_args(request: &MediaRequest) -> Vec<String> {
        let output = request.output_dir.join(&request.output_template);
        let mut args = vec![
            "-f".to_string(),
            request.format.clone(),
            "-o".to_string(),
            output.to_string_lossy().into_owned(),
            "--newline".to_string(),
            "--progress".to_string(),
            "--no-warnings".to_string(),
            "--no-playlist".to_string(),
        ];
        if let Some(merge) = &request.merge_format {
            args.push("--merge-output-format".into());
            args.push(merge.clone());
        }
        if let Some(proxy) = &request.proxy {
            args.push("--proxy".into());
            args.push(proxy.clone());
        }
        if let Some(range) = request.range {
            args.push("--download-sections".into());
            args.push(format!("*{}-{}", range.start, range.end));
        }
        if request.force_keyframes {
            args.push("--force-keyframes-at-cuts".into());
        }
        args.push("--".into());
        args.push(request.url.clone());
        args
    }

    async fn dump_json(&self, url: &str, proxy: Option<&str>) -> crate::Result<serde_json::Value> {
        let output = Command::new(&self.binary_path)
            .args(Self::metadata_args(url, proxy))
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::ExtractionFailed(tail(&stderr)));
        }

        serde_json::from_slice(&output.stdout).map_err(|e| {
            Error::ExtractionFailed(format!("yt-dlp returned malformed metadata: {}", e))
        })
    }
}

#[async_trait]
impl ExtractionEngine for YtDlpEngine {
    async fn estimate_size(
        &self,
        url: &str,
        video_format: Option<&str>,
        audio_format: Option<&str>,
        range: Option<TimeRange>,
        proxy: Option<&str>,
    ) -> crate::Result<Option<u64>> {
        let info = self.dump_json(url, proxy).await?;
        Ok(formats::estimate_size(&info, video_format, audio_format, range))
    }

    async fn fetch_metadata(
        &self,
        url: &str,
        proxy: Option<&str>,
    ) -> crate::Result<serde_json::Value> {
        self.dump_json(url, proxy).await
    }

    async fn fetch_media(
        &self,
        request: MediaRequest,
        progress: ProgressCallback,
    ) -> crate::Result<PathBuf> {
        tokio::fs::create_dir_all(&request.output_dir).await?;

        let mut child = Command::new(&self.binary_path)
            .args(Self::download_args(&request))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| Error::ExternalTool(format!("Failed to execute yt-dlp: {}", e)))?;

        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| tokio::spawn(read_lossy(stderr)));

        if let Some(stdout) = child.stdout.take() {
            report_progress(stdout, &progress).await?;
        }

        let status = child
            .wait()
            .await
            .map_err(|e| Error::ExternalTool(format!("Failed to wait for yt-dlp: {}", e)))?;

        let stderr = match stderr_task {
            Some(task) => task.await.unwrap_or_default(),
            None => String::new(),
        };

        if !status.success() {
            return Err(Error::ExtractionFailed(tail(&stderr)));
        }

        Ok(request.output_dir)
    }

    fn name(&self) -> &'static str {
        "yt-dlp"
    }
}

/// Feed every progress line of `output` to `progress`
///
/// Lines are decoded lossily: file names in yt-dlp output need not be UTF-8.
async fn report_progress<R>(output: R, progress: &ProgressCallback) -> std::io::Result<()>
where
    R: AsyncRead + Unpin,
{
    let mut segments = BufReader::new(output).split(b'\n');
    while let Some(segment) = segments.next_segment().await? {
        let line = String::from_utf8_lossy(&segment);
        if let Some(percent) = parse_progress_line(line.trim_end_matches('\r')) {
            progress(percent);
        }
    }
    Ok(())
}

/// Read a whole stream, decoding lossily
async fn read_lossy<R>(mut stream: R) -> String
where
    R: AsyncRead + Unpin,
{
    let mut buffer = Vec::new();
    if let Err(e) = stream.read_to_end(&mut buffer).await {
        tracing::warn!(error = %e, "failed to read yt-dlp stderr");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Last few non-empty lines of tool output
fn tail(output: &str) -> String {
    let lines: Vec<&str> = output.lines().filter(|l| !l.trim().is_empty()).collect();
    if lines.is_empty() {
        return "yt-dlp exited with an error".to_string();
    }
    lines[lines.len().saturating_sub(STDERR_TAIL_LINES)..].join("\n")
}
