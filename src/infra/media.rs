use async_trait::async_trait;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AspectRatio {
    Landscape,
    Portrait,
    Other,
}

impl AspectRatio {
    pub fn as_str(&self) -> &'static str {
        match self {
            AspectRatio::Landscape => "landscape",
            AspectRatio::Portrait => "portrait",
            AspectRatio::Other => "other",
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum MediaToolError {
    #[error("probe failed: {0}")]
    Probe(String),
    #[error("remux failed: {0}")]
    Remux(String),
    #[error("no decodable video stream in probe output")]
    MalformedMedia,
    #[error("media tool timed out")]
    Timeout,
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// External media tooling behind a seam so the upload pipeline can be
/// exercised without real ffprobe/ffmpeg binaries.
#[async_trait]
pub trait MediaTools: Send + Sync {
    async fn probe_aspect_ratio(&self, input: &Path) -> Result<AspectRatio, MediaToolError>;

    /// Rewrite the container for progressive playback. Returns the path of
    /// the new file; the input is left in place.
    async fn remux_fast_start(&self, input: &Path) -> Result<PathBuf, MediaToolError>;
}

/// Production implementation shelling out to ffprobe/ffmpeg. Each
/// invocation is bounded by `tool_timeout`; on elapse the child is killed.
pub struct FfmpegTools {
    ffprobe_path: String,
    ffmpeg_path: String,
    tool_timeout: Duration,
}

impl FfmpegTools {
    pub fn new(ffprobe_path: String, ffmpeg_path: String, tool_timeout: Duration) -> Self {
        Self {
            ffprobe_path,
            ffmpeg_path,
            tool_timeout,
        }
    }
}

#[async_trait]
impl MediaTools for FfmpegTools {
    async fn probe_aspect_ratio(&self, input: &Path) -> Result<AspectRatio, MediaToolError> {
        let output = timeout(
            self.tool_timeout,
            Command::new(&self.ffprobe_path)
                .args([
                    "-v",
                    "error",
                    "-select_streams",
                    "v:0",
                    "-show_entries",
                    "stream=width,height",
                    "-of",
                    "json",
                ])
                .arg(input)
                .stdout(Stdio::piped())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| MediaToolError::Timeout)??;

        if !output.status.success() {
            return Err(MediaToolError::Probe(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        let (width, height) = parse_probe_output(&output.stdout)?;
        Ok(classify(width, height))
    }

    async fn remux_fast_start(&self, input: &Path) -> Result<PathBuf, MediaToolError> {
        let output_path = processed_path(input);

        let output = timeout(
            self.tool_timeout,
            Command::new(&self.ffmpeg_path)
                .arg("-i")
                .arg(input)
                .args([
                    "-movflags",
                    "faststart",
                    "-map_metadata",
                    "0",
                    "-codec",
                    "copy",
                    "-f",
                    "mp4",
                ])
                .arg(&output_path)
                .stdout(Stdio::null())
                .stderr(Stdio::piped())
                .kill_on_drop(true)
                .output(),
        )
        .await
        .map_err(|_| MediaToolError::Timeout)??;

        if !output.status.success() {
            return Err(MediaToolError::Remux(
                String::from_utf8_lossy(&output.stderr).into_owned(),
            ));
        }

        Ok(output_path)
    }
}

#[derive(Debug, Deserialize)]
struct ProbeOutput {
    #[serde(default)]
    streams: Vec<ProbeStream>,
}

#[derive(Debug, Deserialize)]
struct ProbeStream {
    width: Option<u32>,
    height: Option<u32>,
}

fn parse_probe_output(stdout: &[u8]) -> Result<(u32, u32), MediaToolError> {
    let probe: ProbeOutput =
        serde_json::from_slice(stdout).map_err(|_| MediaToolError::MalformedMedia)?;
    let stream = probe.streams.first().ok_or(MediaToolError::MalformedMedia)?;
    stream
        .width
        .zip(stream.height)
        .ok_or(MediaToolError::MalformedMedia)
}

/// Exact-match classification against a 16:9 reference, landscape checked
/// first. Intentionally has no tolerance band; off-by-one pixel dimensions
/// classify as `Other`.
pub fn classify(width: u32, height: u32) -> AspectRatio {
    let (w, h) = (width as u64, height as u64);
    if w == 16 * h / 9 {
        AspectRatio::Landscape
    } else if h == 16 * w / 9 {
        AspectRatio::Portrait
    } else {
        AspectRatio::Other
    }
}

/// Derive the remux output path by inserting `processed` before the final
/// extension segment of the file name.
pub fn processed_path(input: &Path) -> PathBuf {
    let name = input
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let mut parts: Vec<&str> = name.split('.').collect();
    let new_name = if parts.len() < 2 {
        format!("{}.processed", name)
    } else {
        parts.insert(parts.len() - 1, "processed");
        parts.join(".")
    };

    input.with_file_name(new_name)
}
