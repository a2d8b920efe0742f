//! Media assembly: staging, encoding, and output verification.

use crate::{EncodeOutput, EncodeRequest, EncodeSegment, EncodeSettings, VideoEncoder};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use storyreel_core::{ArtifactRef, AssemblyConfig, CueSheet, MediaKind, SceneArtifact};
use storyreel_error::{AssemblyError, AssemblyErrorKind, StoryreelResult};
use storyreel_storage::ArtifactStore;
use tracing::{info, instrument, warn};

/// The accepted result of an assembly.
#[derive(Debug, Clone)]
pub struct AssemblyOutput {
    /// Durable handle to the encoded video in the artifact store
    pub video: ArtifactRef,
    /// Where the video was written on disk
    pub output_path: PathBuf,
    /// Duration measured from the encoded file
    pub measured_duration: Duration,
    /// True when the degraded-resolution retry produced the output
    pub degraded: bool,
}

/// Turns a cue sheet plus artifact handles into one verified video.
///
/// The assembler computes the segment list and drives the encoder; it does no
/// pixel work itself. Staged inputs live in a scratch directory that is
/// removed on every exit path, while the artifacts in the store are retained
/// even when assembly fails, so failed runs stay diagnosable.
pub struct MediaAssembler {
    store: Arc<dyn ArtifactStore>,
    encoder: Arc<dyn VideoEncoder>,
    config: AssemblyConfig,
}

impl MediaAssembler {
    /// Create an assembler over a store and an encoder.
    pub fn new(
        store: Arc<dyn ArtifactStore>,
        encoder: Arc<dyn VideoEncoder>,
        config: AssemblyConfig,
    ) -> Self {
        Self {
            store,
            encoder,
            config,
        }
    }

    fn settings_for(&self, resolution: &str) -> StoryreelResult<EncodeSettings> {
        let (width, height) = AssemblyConfig::parse_resolution(resolution)?;
        Ok(EncodeSettings {
            fps: self.config.fps,
            width,
            height,
            crf: self.config.crf,
            audio_bitrate: self.config.audio_bitrate.clone(),
            timeout: self.config.encode_timeout(),
        })
    }

    /// Stage every referenced blob into the scratch directory and build the
    /// segment list in cue sheet order.
    async fn stage_segments(
        &self,
        sheet: &CueSheet,
        artifacts: &[SceneArtifact],
        scratch: &Path,
    ) -> StoryreelResult<Vec<EncodeSegment>> {
        let by_index: BTreeMap<usize, &SceneArtifact> =
            artifacts.iter().map(|a| (*a.index(), a)).collect();

        let mut segments = Vec::with_capacity(sheet.len());
        for entry in sheet.entries() {
            let index = *entry.scene_index();
            let artifact = by_index.get(&index).ok_or_else(|| {
                AssemblyError::new(AssemblyErrorKind::MissingArtifact(index))
            })?;

            // Filenames carry the media kind so the two staged blobs can
            // never collide, whatever their MIME types map to.
            let image_path = scratch.join(format!(
                "scene_{index}_image.{}",
                extension_for(artifact.image().mime_type())
            ));
            let audio_path = scratch.join(format!(
                "scene_{index}_audio.{}",
                extension_for(artifact.audio().mime_type())
            ));
            self.store.stage_to(artifact.image(), &image_path).await?;
            self.store.stage_to(artifact.audio(), &audio_path).await?;

            segments.push(EncodeSegment {
                image_path,
                audio_path,
                duration: *entry.duration(),
            });
        }
        Ok(segments)
    }

    async fn encode_with_degraded_retry(
        &self,
        mut request: EncodeRequest,
    ) -> StoryreelResult<(EncodeOutput, bool)> {
        match self.encoder.encode(&request).await {
            Ok(output) => Ok((output, false)),
            Err(error) if self.config.degraded_mode && error.is_degradable() => {
                warn!(
                    %error,
                    degraded_resolution = %self.config.degraded_resolution,
                    "Encode failed, retrying once at degraded resolution"
                );
                request.settings = self.settings_for(&self.config.degraded_resolution)?;
                let output = self.encoder.encode(&request).await?;
                Ok((output, true))
            }
            Err(error) => Err(error.into()),
        }
    }

    fn check_drift(&self, expected: Duration, actual: Duration) -> StoryreelResult<()> {
        let drift = if actual > expected {
            actual - expected
        } else {
            expected - actual
        };
        if drift > self.config.drift_tolerance() {
            Err(AssemblyError::new(AssemblyErrorKind::IntegrityDrift {
                expected_secs: expected.as_secs_f64(),
                actual_secs: actual.as_secs_f64(),
                tolerance_secs: self.config.drift_tolerance_secs,
            }))?;
        }
        Ok(())
    }

    /// Assemble the final video for a resolved cue sheet.
    ///
    /// The encoded file is written to `output_path` and also stored in the
    /// artifact store, so the run manifest carries a durable handle. The
    /// output is only accepted after its measured duration matches the cue
    /// sheet total within the configured tolerance.
    #[instrument(skip(self, sheet, artifacts), fields(scenes = sheet.len()))]
    pub async fn assemble(
        &self,
        sheet: &CueSheet,
        artifacts: &[SceneArtifact],
        output_path: &Path,
    ) -> StoryreelResult<AssemblyOutput> {
        // Dropped on every exit path, including errors.
        let scratch = tempfile::TempDir::new()
            .map_err(|e| AssemblyError::new(AssemblyErrorKind::Io(e.to_string())))?;

        let segments = self.stage_segments(sheet, artifacts, scratch.path()).await?;
        let request = EncodeRequest {
            segments,
            output_path: scratch.path().join("output.mp4"),
            settings: self.settings_for(&self.config.resolution)?,
        };

        let (encoded, degraded) = self.encode_with_degraded_retry(request).await?;
        self.check_drift(sheet.total_duration(), encoded.measured_duration)?;

        let bytes = tokio::fs::read(&encoded.output_path)
            .await
            .map_err(|e| AssemblyError::new(AssemblyErrorKind::Io(e.to_string())))?;
        let video = self.store.store(&bytes, MediaKind::Video, "video/mp4").await?;

        if let Some(parent) = output_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| AssemblyError::new(AssemblyErrorKind::Io(e.to_string())))?;
        }
        tokio::fs::copy(&encoded.output_path, output_path)
            .await
            .map_err(|e| AssemblyError::new(AssemblyErrorKind::Io(e.to_string())))?;

        info!(
            output = %output_path.display(),
            duration_secs = encoded.measured_duration.as_secs_f64(),
            degraded,
            "Assembly complete"
        );
        Ok(AssemblyOutput {
            video,
            output_path: output_path.to_path_buf(),
            measured_duration: encoded.measured_duration,
            degraded,
        })
    }
}

fn extension_for(mime_type: &str) -> &'static str {
    match mime_type {
        "image/png" => "png",
        "image/jpeg" => "jpg",
        "image/webp" => "webp",
        "audio/mpeg" => "mp3",
        "audio/wav" | "audio/x-wav" => "wav",
        "audio/ogg" => "ogg",
        "video/mp4" => "mp4",
        _ => "bin",
    }
}
