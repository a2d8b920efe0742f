//! Integration tests for media assembly over a mock encoder.

use async_trait::async_trait;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use storyreel_assemble::{
    AssemblyOutput, EncodeOutput, EncodeRequest, MediaAssembler, TimingResolver, VideoEncoder,
};
use storyreel_core::{AssemblyConfig, CueSheet, MediaKind, SceneArtifact, TimingConfig};
use storyreel_error::{AssemblyError, AssemblyErrorKind, StoryreelResult};
use storyreel_storage::{ArtifactStore, FileSystemStore};

fn assembly_config(degraded_mode: bool) -> AssemblyConfig {
    AssemblyConfig {
        fps: 24,
        resolution: "1920x1080".into(),
        crf: 21,
        audio_bitrate: "192k".into(),
        drift_tolerance_secs: 0.5,
        encode_timeout_secs: 900,
        degraded_mode,
        degraded_resolution: "1280x720".into(),
    }
}

fn timing() -> TimingResolver {
    TimingResolver::new(&TimingConfig {
        scene_floor_secs: 3.0,
        trailing_pad_secs: 0.35,
    })
}

/// Encoder double: records every request, optionally fails the first call,
/// and reports a measured duration equal to the requested total plus a
/// configurable drift.
struct MockEncoder {
    queued_failure: Mutex<Option<AssemblyError>>,
    drift: Duration,
    resolutions_seen: Mutex<Vec<(u32, u32)>>,
}

impl MockEncoder {
    fn succeeding() -> Self {
        Self {
            queued_failure: Mutex::new(None),
            drift: Duration::ZERO,
            resolutions_seen: Mutex::new(Vec::new()),
        }
    }

    fn failing_once(error: AssemblyError) -> Self {
        Self {
            queued_failure: Mutex::new(Some(error)),
            drift: Duration::ZERO,
            resolutions_seen: Mutex::new(Vec::new()),
        }
    }

    fn drifting(drift: Duration) -> Self {
        Self {
            queued_failure: Mutex::new(None),
            drift,
            resolutions_seen: Mutex::new(Vec::new()),
        }
    }

    fn calls(&self) -> usize {
        self.resolutions_seen.lock().unwrap().len()
    }
}

#[async_trait]
impl VideoEncoder for MockEncoder {
    async fn encode(&self, request: &EncodeRequest) -> Result<EncodeOutput, AssemblyError> {
        self.resolutions_seen
            .lock()
            .unwrap()
            .push((request.settings.width, request.settings.height));
        if let Some(error) = self.queued_failure.lock().unwrap().take() {
            return Err(error);
        }
        // Staged inputs must exist before the encoder runs.
        for segment in &request.segments {
            assert!(segment.image_path.exists(), "image not staged");
            assert!(segment.audio_path.exists(), "audio not staged");
        }
        tokio::fs::write(&request.output_path, b"encoded video")
            .await
            .map_err(|e| AssemblyError::new(AssemblyErrorKind::Io(e.to_string())))?;
        let total: Duration = request.segments.iter().map(|s| s.duration).sum();
        Ok(EncodeOutput {
            output_path: request.output_path.clone(),
            measured_duration: total + self.drift,
        })
    }
}

struct Fixture {
    _dir: tempfile::TempDir,
    store: Arc<FileSystemStore>,
    artifacts: Vec<SceneArtifact>,
    sheet: CueSheet,
    output_path: PathBuf,
}

fn io_error(e: std::io::Error) -> AssemblyError {
    AssemblyError::new(AssemblyErrorKind::Io(e.to_string()))
}

async fn fixture(scene_indices: &[usize]) -> StoryreelResult<Fixture> {
    let dir = tempfile::TempDir::new().map_err(io_error)?;
    let store = Arc::new(FileSystemStore::new(dir.path().join("artifacts"))?);

    let mut artifacts = Vec::new();
    for &index in scene_indices {
        let image = store
            .store(
                format!("png bytes {index}").as_bytes(),
                MediaKind::Image,
                "image/png",
            )
            .await?;
        let audio = store
            .store(
                format!("mp3 bytes {index}").as_bytes(),
                MediaKind::Audio,
                "audio/mpeg",
            )
            .await?;
        artifacts.push(SceneArtifact::new(
            index,
            image,
            audio,
            Duration::from_secs_f64(2.0 + index as f64),
        ));
    }

    let sheet = timing().resolve(&artifacts)?;
    let output_path = dir.path().join("out").join("episode.mp4");
    Ok(Fixture {
        _dir: dir,
        store,
        artifacts,
        sheet,
        output_path,
    })
}

async fn assemble(
    fixture: &Fixture,
    encoder: Arc<MockEncoder>,
    degraded_mode: bool,
) -> StoryreelResult<AssemblyOutput> {
    let assembler = MediaAssembler::new(
        Arc::clone(&fixture.store) as Arc<dyn ArtifactStore>,
        encoder,
        assembly_config(degraded_mode),
    );
    assembler
        .assemble(&fixture.sheet, &fixture.artifacts, &fixture.output_path)
        .await
}

#[tokio::test]
async fn assembles_and_stores_the_verified_output() -> anyhow::Result<()> {
    let fixture = fixture(&[0, 1, 2]).await?;
    let encoder = Arc::new(MockEncoder::succeeding());
    let output = assemble(&fixture, Arc::clone(&encoder), false).await?;

    assert!(!output.degraded);
    assert_eq!(output.measured_duration, fixture.sheet.total_duration());
    assert!(fixture.output_path.exists());
    assert!(fixture.store.exists(&output.video).await);
    assert_eq!(*output.video.media_kind(), MediaKind::Video);
    assert_eq!(encoder.calls(), 1);
    Ok(())
}

#[tokio::test]
async fn missing_artifact_fails_assembly() -> anyhow::Result<()> {
    let mut fixture = fixture(&[0, 1]).await?;
    // Cue sheet still names scene 1; its artifact is gone.
    fixture.artifacts.retain(|a| *a.index() != 1);

    let result = assemble(&fixture, Arc::new(MockEncoder::succeeding()), false).await;
    let error = result.expect_err("assembly should fail");
    assert!(error.to_string().contains("Missing artifact for scene 1"));
    Ok(())
}

#[tokio::test]
async fn drift_beyond_tolerance_is_rejected() -> anyhow::Result<()> {
    let fixture = fixture(&[0, 1]).await?;
    let encoder = Arc::new(MockEncoder::drifting(Duration::from_secs(2)));

    let result = assemble(&fixture, encoder, false).await;
    let error = result.expect_err("drift should fail assembly");
    assert!(error.to_string().contains("drifted"));
    assert!(!fixture.output_path.exists(), "drifted output must not ship");
    Ok(())
}

#[tokio::test]
async fn degraded_retry_reencodes_at_lower_resolution() -> anyhow::Result<()> {
    let fixture = fixture(&[0]).await?;
    let encoder = Arc::new(MockEncoder::failing_once(AssemblyError::new(
        AssemblyErrorKind::Encoding("x264 blew up".into()),
    )));

    let output = assemble(&fixture, Arc::clone(&encoder), true).await?;
    assert!(output.degraded);
    assert_eq!(
        *encoder.resolutions_seen.lock().unwrap(),
        vec![(1920, 1080), (1280, 720)]
    );
    Ok(())
}

#[tokio::test]
async fn encoding_failure_without_degraded_mode_is_fatal() -> anyhow::Result<()> {
    let fixture = fixture(&[0]).await?;
    let encoder = Arc::new(MockEncoder::failing_once(AssemblyError::new(
        AssemblyErrorKind::Encoding("x264 blew up".into()),
    )));

    let result = assemble(&fixture, Arc::clone(&encoder), false).await;
    assert!(result.is_err());
    assert_eq!(encoder.calls(), 1, "no retry without degraded mode");

    // Intermediate artifacts are retained for diagnosis.
    for artifact in &fixture.artifacts {
        assert!(fixture.store.exists(artifact.image()).await);
        assert!(fixture.store.exists(artifact.audio()).await);
    }
    Ok(())
}

/// Encoder double that checks each staged pair landed in distinct files with
/// the right bytes.
struct StagingCheckEncoder;

#[async_trait]
impl VideoEncoder for StagingCheckEncoder {
    async fn encode(&self, request: &EncodeRequest) -> Result<EncodeOutput, AssemblyError> {
        for segment in &request.segments {
            assert_ne!(
                segment.image_path, segment.audio_path,
                "image and audio staged to the same file"
            );
            let image = tokio::fs::read(&segment.image_path).await.map_err(io_error)?;
            let audio = tokio::fs::read(&segment.audio_path).await.map_err(io_error)?;
            assert_eq!(image.as_slice(), b"image bytes");
            assert_eq!(audio.as_slice(), b"audio bytes");
        }
        tokio::fs::write(&request.output_path, b"encoded video")
            .await
            .map_err(io_error)?;
        let total: Duration = request.segments.iter().map(|s| s.duration).sum();
        Ok(EncodeOutput {
            output_path: request.output_path.clone(),
            measured_duration: total,
        })
    }
}

#[tokio::test]
async fn unrecognized_mime_types_stage_to_distinct_files() -> anyhow::Result<()> {
    // Both MIME types fall through to the same fallback extension; the
    // staged filenames must still differ per media kind.
    let dir = tempfile::TempDir::new()?;
    let store = Arc::new(FileSystemStore::new(dir.path().join("artifacts"))?);
    let image = store
        .store(b"image bytes", MediaKind::Image, "application/octet-stream")
        .await?;
    let audio = store
        .store(b"audio bytes", MediaKind::Audio, "application/octet-stream")
        .await?;
    let artifacts = vec![SceneArtifact::new(0, image, audio, Duration::from_secs(2))];
    let sheet = timing().resolve(&artifacts)?;

    let assembler = MediaAssembler::new(
        Arc::clone(&store) as Arc<dyn ArtifactStore>,
        Arc::new(StagingCheckEncoder),
        assembly_config(false),
    );
    let output_path = dir.path().join("out").join("episode.mp4");
    let output = assembler.assemble(&sheet, &artifacts, &output_path).await?;
    assert_eq!(output.measured_duration, sheet.total_duration());
    Ok(())
}

#[tokio::test]
async fn non_degradable_failure_is_not_retried() -> anyhow::Result<()> {
    let fixture = fixture(&[0]).await?;
    let encoder = Arc::new(MockEncoder::failing_once(AssemblyError::new(
        AssemblyErrorKind::Probe("no ffprobe".into()),
    )));

    let result = assemble(&fixture, Arc::clone(&encoder), true).await;
    assert!(result.is_err());
    assert_eq!(encoder.calls(), 1, "probe failures reproduce at any resolution");
    Ok(())
}
