//! Video encoding collaborator.
//!
//! The assembler computes the segment list; the encoder turns it into one
//! continuous video. [`FfmpegEncoder`] drives an external `ffmpeg` binary
//! through its concat demuxer and measures the produced output with
//! `ffprobe`. The trait seam exists so assembly logic can be tested without
//! an encoder on the host.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use storyreel_error::{AssemblyError, AssemblyErrorKind};
use tokio::process::Command;
use tracing::{debug, instrument};

/// One timeline slot handed to the encoder: a still image held on screen for
/// `duration` while its narration clip plays.
#[derive(Debug, Clone)]
pub struct EncodeSegment {
    /// Staged image file
    pub image_path: PathBuf,
    /// Staged narration clip
    pub audio_path: PathBuf,
    /// Resolved on-screen duration
    pub duration: Duration,
}

/// Encoder tuning derived from assembly configuration.
#[derive(Debug, Clone)]
pub struct EncodeSettings {
    /// Output frame rate
    pub fps: u32,
    /// Output width in pixels
    pub width: u32,
    /// Output height in pixels
    pub height: u32,
    /// x264 constant rate factor
    pub crf: u32,
    /// AAC audio bitrate, e.g. "192k"
    pub audio_bitrate: String,
    /// Hard timeout for the encode step
    pub timeout: Duration,
}

/// A full encode job: ordered segments plus output destination.
#[derive(Debug, Clone)]
pub struct EncodeRequest {
    /// Segments in playback order
    pub segments: Vec<EncodeSegment>,
    /// Destination for the encoded video
    pub output_path: PathBuf,
    /// Encoder tuning
    pub settings: EncodeSettings,
}

/// Result of a successful encode.
#[derive(Debug, Clone)]
pub struct EncodeOutput {
    /// Where the encoded video was written
    pub output_path: PathBuf,
    /// Duration measured from the produced file, not assumed from the request
    pub measured_duration: Duration,
}

/// Media-encoding collaborator.
#[async_trait]
pub trait VideoEncoder: Send + Sync {
    /// Encode the segments into one continuous video and measure the result.
    async fn encode(&self, request: &EncodeRequest) -> Result<EncodeOutput, AssemblyError>;
}

/// Quote a path for an ffmpeg concat list entry.
///
/// The concat demuxer expects single-quoted paths with embedded quotes
/// closed, escaped, and reopened.
fn concat_quote(path: &Path) -> String {
    path.to_string_lossy().replace('\'', "'\\''")
}

/// Build the image concat list: each still held for its slot duration.
///
/// The final image is repeated without a duration line; the concat demuxer
/// otherwise drops the last `duration` directive and cuts the final slot
/// short.
pub(crate) fn video_concat_list(segments: &[EncodeSegment]) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for segment in segments {
        list.push_str(&format!(
            "file '{}'\nduration {:.6}\n",
            concat_quote(&segment.image_path),
            segment.duration.as_secs_f64()
        ));
    }
    if let Some(last) = segments.last() {
        list.push_str(&format!("file '{}'\n", concat_quote(&last.image_path)));
    }
    list
}

/// Build the audio concat list in the same playback order.
pub(crate) fn audio_concat_list(segments: &[EncodeSegment]) -> String {
    let mut list = String::from("ffconcat version 1.0\n");
    for segment in segments {
        list.push_str(&format!("file '{}'\n", concat_quote(&segment.audio_path)));
    }
    list
}

/// Encoder backed by the host's `ffmpeg` and `ffprobe` binaries.
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    ffprobe: PathBuf,
}

impl Default for FfmpegEncoder {
    fn default() -> Self {
        Self::new("ffmpeg", "ffprobe")
    }
}

impl FfmpegEncoder {
    /// Create an encoder using explicit binary paths.
    pub fn new(ffmpeg: impl Into<PathBuf>, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
            ffprobe: ffprobe.into(),
        }
    }

    async fn write_list(path: &Path, contents: &str) -> Result<(), AssemblyError> {
        tokio::fs::write(path, contents)
            .await
            .map_err(|e| AssemblyError::new(AssemblyErrorKind::Io(e.to_string())))
    }

    async fn run_ffmpeg(&self, request: &EncodeRequest) -> Result<(), AssemblyError> {
        let scratch = request
            .output_path
            .parent()
            .unwrap_or_else(|| Path::new("."));
        let video_list = scratch.join("video_concat.txt");
        let audio_list = scratch.join("audio_concat.txt");
        Self::write_list(&video_list, &video_concat_list(&request.segments)).await?;
        Self::write_list(&audio_list, &audio_concat_list(&request.segments)).await?;

        let settings = &request.settings;
        let mut command = Command::new(&self.ffmpeg);
        command
            .arg("-y")
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(&video_list)
            .args(["-f", "concat", "-safe", "0", "-i"])
            .arg(&audio_list)
            .args([
                "-vf",
                &format!(
                    "scale={}:{}:force_original_aspect_ratio=decrease,\
                     pad={}:{}:(ow-iw)/2:(oh-ih)/2,fps={}",
                    settings.width, settings.height, settings.width, settings.height, settings.fps
                ),
            ])
            .args(["-c:v", "libx264", "-crf", &settings.crf.to_string()])
            .args(["-pix_fmt", "yuv420p"])
            .args(["-c:a", "aac", "-b:a", &settings.audio_bitrate])
            .args(["-movflags", "+faststart"])
            .arg("-shortest")
            .arg(&request.output_path)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        debug!(output = %request.output_path.display(), "Launching ffmpeg");
        let child = command
            .spawn()
            .map_err(|e| AssemblyError::new(AssemblyErrorKind::EncoderUnavailable(e.to_string())))?;

        let waited = tokio::time::timeout(settings.timeout, child.wait_with_output()).await;
        let output = match waited {
            Ok(result) => result
                .map_err(|e| AssemblyError::new(AssemblyErrorKind::Encoding(e.to_string())))?,
            // kill_on_drop reaps the child when the future is dropped.
            Err(_) => {
                return Err(AssemblyError::new(AssemblyErrorKind::Timeout(
                    settings.timeout.as_secs(),
                )));
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let tail: String = stderr
                .lines()
                .rev()
                .take(8)
                .collect::<Vec<_>>()
                .into_iter()
                .rev()
                .collect::<Vec<_>>()
                .join("\n");
            return Err(AssemblyError::new(AssemblyErrorKind::Encoding(format!(
                "ffmpeg exited with {}: {}",
                output.status, tail
            ))));
        }
        Ok(())
    }

    /// Measure a media file's container duration with ffprobe.
    pub async fn probe_duration(&self, path: &Path) -> Result<Duration, AssemblyError> {
        let output = Command::new(&self.ffprobe)
            .args(["-v", "error"])
            .args(["-show_entries", "format=duration"])
            .args(["-of", "default=noprint_wrappers=1:nokey=1"])
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| AssemblyError::new(AssemblyErrorKind::Probe(e.to_string())))?;

        if !output.status.success() {
            return Err(AssemblyError::new(AssemblyErrorKind::Probe(format!(
                "ffprobe exited with {}",
                output.status
            ))));
        }

        let text = String::from_utf8_lossy(&output.stdout);
        let secs: f64 = text.trim().parse().map_err(|_| {
            AssemblyError::new(AssemblyErrorKind::Probe(format!(
                "unparseable duration '{}'",
                text.trim()
            )))
        })?;
        if !secs.is_finite() || secs < 0.0 {
            return Err(AssemblyError::new(AssemblyErrorKind::Probe(format!(
                "invalid duration {secs}"
            ))));
        }
        Ok(Duration::from_secs_f64(secs))
    }
}

#[async_trait]
impl VideoEncoder for FfmpegEncoder {
    #[instrument(skip(self, request), fields(segments = request.segments.len()))]
    async fn encode(&self, request: &EncodeRequest) -> Result<EncodeOutput, AssemblyError> {
        if request.segments.is_empty() {
            return Err(AssemblyError::new(AssemblyErrorKind::InvalidCueSheet(
                "no segments to encode".into(),
            )));
        }
        self.run_ffmpeg(request).await?;
        let measured_duration = self.probe_duration(&request.output_path).await?;
        Ok(EncodeOutput {
            output_path: request.output_path.clone(),
            measured_duration,
        })
    }
}
