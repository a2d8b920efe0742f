//! The run coordinator.

use crate::{Notifier, ProductionRun, RunManifest, RunNotice};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use storyreel_assemble::{AssemblyOutput, MediaAssembler, TimingResolver, VideoEncoder};
use storyreel_core::{RunId, RunStatus, ScriptDescriptor, StoryreelConfig};
use storyreel_error::{
    AssemblyErrorKind, RunError, RunErrorKind, StoryreelError, StoryreelErrorKind, StoryreelResult,
};
use storyreel_generate::{AudioGenerator, GenerationWorkerPool, ImageGenerator};
use storyreel_storage::ArtifactStore;
use tokio::sync::{mpsc, watch};
use tracing::{info, instrument, warn};

/// Outcome of one coordinated run.
///
/// The coordinator returns `Ok` for every run that reached a terminal status,
/// including failed ones; `Err` is reserved for infrastructure faults (lost
/// channels, unwritable manifests) where no terminal status could be
/// recorded.
#[derive(Debug)]
pub struct RunReport {
    /// The run's identity
    pub run_id: RunId,
    /// Terminal status
    pub status: RunStatus,
    /// Number of scenes in the script
    pub scenes_total: usize,
    /// Number of scenes that failed terminally
    pub scenes_failed: usize,
    /// The verified output, when the run succeeded
    pub output: Option<AssemblyOutput>,
    /// Where the run manifest was persisted
    pub manifest_path: PathBuf,
}

/// Orchestrates a production run end to end.
///
/// Generation completions are consumed in arrival order, which is
/// non-deterministic; nothing here depends on it. The skip threshold is
/// checked after every event, and exceeding it cancels outstanding work while
/// letting in-flight attempts drain.
pub struct PipelineCoordinator {
    image_generator: Arc<dyn ImageGenerator>,
    audio_generator: Arc<dyn AudioGenerator>,
    store: Arc<dyn ArtifactStore>,
    encoder: Arc<dyn VideoEncoder>,
    notifier: Arc<dyn Notifier>,
    config: StoryreelConfig,
}

impl PipelineCoordinator {
    /// Create a coordinator over the run's collaborators.
    pub fn new(
        image_generator: Arc<dyn ImageGenerator>,
        audio_generator: Arc<dyn AudioGenerator>,
        store: Arc<dyn ArtifactStore>,
        encoder: Arc<dyn VideoEncoder>,
        notifier: Arc<dyn Notifier>,
        config: StoryreelConfig,
    ) -> Self {
        Self {
            image_generator,
            audio_generator,
            store,
            encoder,
            notifier,
            config,
        }
    }

    /// Produce one video for a script.
    #[instrument(skip(self, script), fields(title = %script.title(), scenes = script.len()))]
    pub async fn run(&self, script: ScriptDescriptor) -> StoryreelResult<RunReport> {
        let mut run = ProductionRun::new(script.clone());
        let run_id = run.run_id();
        let run_dir = Path::new(&self.config.run.runs_dir).join(run_id.to_string());
        let mut manifest = RunManifest::new(run_id, script.clone());
        manifest.save(&run_dir).await?;

        info!(%run_id, scenes = script.len(), "Run started");
        self.generate_all(&mut run, &script).await?;

        manifest.scene_states = run.terminal_states();
        let failed = run.failed_scenes();
        let allowed = self.config.run.max_skipped_scenes;
        let total = run.total_scenes();

        if failed > allowed {
            let threshold = RunErrorKind::ThresholdExceeded {
                failed,
                total,
                allowed,
            };
            warn!(%run_id, reason = %threshold, "Run failed in generation");
            return self
                .finish_failed(run, manifest, &run_dir, threshold.to_string())
                .await;
        }

        run.set_status(RunStatus::Assembling);
        manifest.status = RunStatus::Assembling;
        manifest.save(&run_dir).await?;

        match self
            .assemble_phase(&run, &mut manifest, &run_dir, &script)
            .await
        {
            Ok(output) => {
                run.set_status(RunStatus::Succeeded);
                manifest.status = RunStatus::Succeeded;
                manifest.output = Some(output.video.clone());
                manifest.output_path = Some(output.output_path.display().to_string());
                manifest.save(&run_dir).await?;

                info!(%run_id, output = %output.output_path.display(), "Run succeeded");
                self.send_notice(&run, Some(&output)).await;
                Ok(RunReport {
                    run_id,
                    status: RunStatus::Succeeded,
                    scenes_total: total,
                    scenes_failed: failed,
                    output: Some(output),
                    manifest_path: RunManifest::path_in(&run_dir),
                })
            }
            Err(error) => {
                let reason = failure_reason(&error);
                warn!(%run_id, %error, "Run failed in assembly");
                self.finish_failed(run, manifest, &run_dir, reason).await
            }
        }
    }

    /// Fan out generation and drain every completion event.
    async fn generate_all(
        &self,
        run: &mut ProductionRun,
        script: &ScriptDescriptor,
    ) -> StoryreelResult<()> {
        let pool = GenerationWorkerPool::new(
            Arc::clone(&self.image_generator),
            Arc::clone(&self.audio_generator),
            Arc::clone(&self.store),
            self.config.generation.clone(),
        );
        let (events_tx, mut events_rx) = mpsc::channel(script.len().max(1) * 2);
        let (cancel_tx, cancel_rx) = watch::channel(false);
        pool.spawn(script, events_tx, cancel_rx);
        // The pool's tasks hold the remaining senders; the channel closes
        // once every branch has reported.

        let allowed = self.config.run.max_skipped_scenes;
        let mut cancelled = false;
        while let Some(event) = events_rx.recv().await {
            run.apply_event(event);
            if !cancelled && run.failed_scenes() > allowed {
                info!(
                    failed = run.failed_scenes(),
                    allowed, "Skip threshold exceeded, cancelling outstanding generation"
                );
                let _ = cancel_tx.send(true);
                cancelled = true;
            }
        }

        if !run.all_scenes_terminal() {
            Err(RunError::new(RunErrorKind::ChannelClosed(
                run.outstanding_scenes(),
            )))?;
        }
        Ok(())
    }

    async fn assemble_phase(
        &self,
        run: &ProductionRun,
        manifest: &mut RunManifest,
        run_dir: &Path,
        script: &ScriptDescriptor,
    ) -> StoryreelResult<AssemblyOutput> {
        let artifacts = run.ready_artifacts();
        let sheet = TimingResolver::new(&self.config.timing).resolve(&artifacts)?;
        manifest.cue_sheet = Some(sheet.clone());
        manifest.save(run_dir).await?;

        let assembler = MediaAssembler::new(
            Arc::clone(&self.store),
            Arc::clone(&self.encoder),
            self.config.assembly.clone(),
        );
        let output_path = run_dir.join(format!("episode_{:02}.mp4", script.episode_number()));
        assembler.assemble(&sheet, &artifacts, &output_path).await
    }

    async fn finish_failed(
        &self,
        mut run: ProductionRun,
        mut manifest: RunManifest,
        run_dir: &Path,
        reason: String,
    ) -> StoryreelResult<RunReport> {
        let status = RunStatus::Failed { reason };
        run.set_status(status.clone());
        manifest.status = status.clone();
        manifest.scene_states = run.terminal_states();
        manifest.save(run_dir).await?;
        self.send_notice(&run, None).await;
        Ok(RunReport {
            run_id: run.run_id(),
            status,
            scenes_total: run.total_scenes(),
            scenes_failed: run.failed_scenes(),
            output: None,
            manifest_path: RunManifest::path_in(run_dir),
        })
    }

    /// Best-effort terminal notification; never fails the run.
    async fn send_notice(&self, run: &ProductionRun, output: Option<&AssemblyOutput>) {
        let notice = RunNotice {
            run_id: run.run_id(),
            status: run.status().clone(),
            title: run.script().title().clone(),
            episode_number: *run.script().episode_number(),
            output_location: output.map(|o| o.output_path.display().to_string()),
        };
        if let Err(error) = self.notifier.notify(&notice).await {
            warn!(%error, "Run notification failed");
        }
    }
}

/// Short, stable reason string for a failed assembly phase.
fn failure_reason(error: &StoryreelError) -> String {
    match error.kind() {
        StoryreelErrorKind::Assembly(assembly) => {
            let name = match assembly.kind {
                AssemblyErrorKind::Encoding(_) => "Encoding",
                AssemblyErrorKind::EncoderUnavailable(_) => "EncoderUnavailable",
                AssemblyErrorKind::IntegrityDrift { .. } => "IntegrityDrift",
                AssemblyErrorKind::Probe(_) => "Probe",
                AssemblyErrorKind::Timeout(_) => "Timeout",
                AssemblyErrorKind::MissingArtifact(_) => "MissingArtifact",
                AssemblyErrorKind::Io(_) => "Io",
                AssemblyErrorKind::InvalidCueSheet(_) => "InvalidCueSheet",
            };
            format!("assembly error: {name}")
        }
        _ => format!("assembly error: {error}"),
    }
}
