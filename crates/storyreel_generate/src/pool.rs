//! Bounded-concurrency generation worker pool.
//!
//! One image task and one audio task per scene, each gated by its own
//! semaphore — the two external services have different cost, latency and
//! rate-limit profiles, so their ceilings are configured separately. Tasks
//! for different scenes are interchangeable; completion order is
//! deliberately unordered and must never leak into downstream ordering.

use crate::{
    AttemptKind, AudioGenerator, BranchOutput, CompletionEvent, GeneratedAudio, GeneratedImage,
    ImageGenerator,
};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::Duration;
use storyreel_core::{GenerationConfig, MediaKind, SceneSpec, ScriptDescriptor};
use storyreel_error::{GenerationError, GenerationErrorKind, RetryableError};
use storyreel_storage::ArtifactStore;
use tokio::sync::{Semaphore, mpsc, watch};
use tokio_retry2::{
    Retry, RetryError,
    strategy::{ExponentialBackoff, jitter},
};
use tracing::{debug, warn};

/// Fans out generation work for a script across two bounded pools.
///
/// Every (scene, kind) branch produces exactly one [`CompletionEvent`] on the
/// supplied channel: the stored artifact on success, or the error that
/// exhausted the branch. Cancellation (via the watch channel) prevents new
/// attempts from being issued; attempts already awaiting a collaborator are
/// allowed to drain, since partial billing has already occurred.
pub struct GenerationWorkerPool {
    image_generator: Arc<dyn ImageGenerator>,
    audio_generator: Arc<dyn AudioGenerator>,
    store: Arc<dyn ArtifactStore>,
    config: GenerationConfig,
    image_permits: Arc<Semaphore>,
    audio_permits: Arc<Semaphore>,
}

impl GenerationWorkerPool {
    /// Create a pool over the given collaborators and artifact store.
    pub fn new(
        image_generator: Arc<dyn ImageGenerator>,
        audio_generator: Arc<dyn AudioGenerator>,
        store: Arc<dyn ArtifactStore>,
        config: GenerationConfig,
    ) -> Self {
        let image_permits = Arc::new(Semaphore::new(config.image_concurrency.max(1)));
        let audio_permits = Arc::new(Semaphore::new(config.audio_concurrency.max(1)));
        Self {
            image_generator,
            audio_generator,
            store,
            config,
            image_permits,
            audio_permits,
        }
    }

    /// Spawn both branch tasks for every scene in the script.
    ///
    /// Returns immediately; progress is reported through `events`.
    pub fn spawn(
        &self,
        script: &ScriptDescriptor,
        events: mpsc::Sender<CompletionEvent>,
        cancel: watch::Receiver<bool>,
    ) {
        for scene in script.scenes() {
            for kind in [AttemptKind::Image, AttemptKind::Audio] {
                let task = BranchTask {
                    scene: scene.clone(),
                    kind,
                    image_generator: Arc::clone(&self.image_generator),
                    audio_generator: Arc::clone(&self.audio_generator),
                    store: Arc::clone(&self.store),
                    config: self.config.clone(),
                    permits: match kind {
                        AttemptKind::Image => Arc::clone(&self.image_permits),
                        AttemptKind::Audio => Arc::clone(&self.audio_permits),
                    },
                    events: events.clone(),
                    cancel: cancel.clone(),
                };
                tokio::spawn(task.run());
            }
        }
    }
}

/// One (scene, kind) branch: acquire a permit, attempt with retry, report.
struct BranchTask {
    scene: SceneSpec,
    kind: AttemptKind,
    image_generator: Arc<dyn ImageGenerator>,
    audio_generator: Arc<dyn AudioGenerator>,
    store: Arc<dyn ArtifactStore>,
    config: GenerationConfig,
    permits: Arc<Semaphore>,
    events: mpsc::Sender<CompletionEvent>,
    cancel: watch::Receiver<bool>,
}

impl BranchTask {
    async fn run(self) {
        let scene_index = *self.scene.index();

        // Never issue a request for a branch that was cancelled before it
        // could start; waiting for a permit counts as not started.
        if *self.cancel.borrow() {
            self.report(0, Err(cancelled())).await;
            return;
        }

        let _permit = tokio::select! {
            permit = Arc::clone(&self.permits).acquire_owned() => {
                match permit {
                    Ok(permit) => permit,
                    // Pool torn down; nothing left to report to.
                    Err(_) => return,
                }
            }
            _ = cancelled_signal(self.cancel.clone()) => {
                self.report(0, Err(cancelled())).await;
                return;
            }
        };

        if *self.cancel.borrow() {
            self.report(0, Err(cancelled())).await;
            return;
        }

        debug!(scene = scene_index, kind = %self.kind, "Branch started");

        let attempts = Arc::new(AtomicU32::new(0));
        let outcome = self.attempt_with_retry(Arc::clone(&attempts)).await;
        let attempts = attempts.load(Ordering::SeqCst);

        let outcome = outcome.map_err(|error| {
            if error.is_retryable() {
                // The strategy ran dry on a transient error.
                GenerationError::new(GenerationErrorKind::RetriesExhausted {
                    attempts,
                    last_error: error.to_string(),
                })
            } else {
                error
            }
        });

        if let Err(error) = &outcome {
            warn!(scene = scene_index, kind = %self.kind, %error, "Branch failed");
        } else {
            debug!(scene = scene_index, kind = %self.kind, attempts, "Branch succeeded");
        }
        self.report(attempts, outcome).await;
    }

    async fn attempt_with_retry(
        &self,
        attempts: Arc<AtomicU32>,
    ) -> Result<BranchOutput, GenerationError> {
        let strategy = ExponentialBackoff::from_millis(self.config.initial_backoff_ms)
            .factor(2)
            .max_delay(Duration::from_secs(self.config.max_backoff_secs))
            .map(jitter)
            .take(self.config.max_attempts.saturating_sub(1) as usize);

        Retry::spawn(strategy, || {
            let attempts = Arc::clone(&attempts);
            async move {
                if *self.cancel.borrow() {
                    return Err(RetryError::Permanent(cancelled()));
                }
                attempts.fetch_add(1, Ordering::SeqCst);

                match self.attempt_once().await {
                    Ok(output) => Ok(output),
                    Err(error) if error.is_retryable() => {
                        warn!(
                            scene = self.scene.index(),
                            kind = %self.kind,
                            %error,
                            "Transient generation failure, will retry"
                        );
                        Err(RetryError::Transient {
                            err: error,
                            retry_after: None,
                        })
                    }
                    Err(error) => {
                        warn!(
                            scene = self.scene.index(),
                            kind = %self.kind,
                            %error,
                            "Permanent generation failure"
                        );
                        Err(RetryError::Permanent(error))
                    }
                }
            }
        })
        .await
    }

    /// One attempt: call the collaborator under the hard timeout, then
    /// persist the produced bytes.
    async fn attempt_once(&self) -> Result<BranchOutput, GenerationError> {
        let timeout = self.config.attempt_timeout();
        match self.kind {
            AttemptKind::Image => {
                let image = run_with_timeout(
                    timeout,
                    self.image_generator.generate_image(&self.scene),
                    self.config.attempt_timeout_secs,
                )
                .await?;
                self.store_image(image).await
            }
            AttemptKind::Audio => {
                let audio = run_with_timeout(
                    timeout,
                    self.audio_generator.generate_audio(&self.scene),
                    self.config.attempt_timeout_secs,
                )
                .await?;
                self.store_audio(audio).await
            }
        }
    }

    async fn store_image(&self, image: GeneratedImage) -> Result<BranchOutput, GenerationError> {
        let artifact = self
            .store
            .store(image.data(), MediaKind::Image, image.mime_type())
            .await
            .map_err(|e| {
                GenerationError::new(GenerationErrorKind::ArtifactStore(e.to_string()))
            })?;
        Ok(BranchOutput::Image(artifact))
    }

    async fn store_audio(&self, audio: GeneratedAudio) -> Result<BranchOutput, GenerationError> {
        let artifact = self
            .store
            .store(audio.data(), MediaKind::Audio, audio.mime_type())
            .await
            .map_err(|e| {
                GenerationError::new(GenerationErrorKind::ArtifactStore(e.to_string()))
            })?;
        Ok(BranchOutput::Audio {
            artifact,
            duration: *audio.duration(),
        })
    }

    async fn report(&self, attempts: u32, outcome: Result<BranchOutput, GenerationError>) {
        let event = CompletionEvent {
            scene_index: *self.scene.index(),
            kind: self.kind,
            attempts,
            outcome,
        };
        // The receiver may already have hung up after a run-fatal decision.
        let _ = self.events.send(event).await;
    }
}

fn cancelled() -> GenerationError {
    GenerationError::new(GenerationErrorKind::Cancelled)
}

/// Resolve once the cancel flag flips to true.
async fn cancelled_signal(mut cancel: watch::Receiver<bool>) {
    loop {
        if *cancel.borrow() {
            return;
        }
        if cancel.changed().await.is_err() {
            // Sender dropped without cancelling; wait forever.
            std::future::pending::<()>().await;
        }
    }
}

async fn run_with_timeout<T>(
    timeout: Duration,
    future: impl std::future::Future<Output = Result<T, GenerationError>>,
    timeout_secs: u64,
) -> Result<T, GenerationError> {
    match tokio::time::timeout(timeout, future).await {
        Ok(result) => result,
        Err(_) => Err(GenerationError::new(GenerationErrorKind::Timeout(
            timeout_secs,
        ))),
    }
}
