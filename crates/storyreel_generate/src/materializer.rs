//! Per-scene materialization state machine.
//!
//! Each scene is a two-branch join: the image branch and the audio branch
//! progress independently, and the scene's combined state is computed from an
//! explicit rule table over the pair. A failure on either branch is terminal
//! for the scene; a sibling success arriving after that failure is recorded
//! but can never resurrect the scene.

use crate::{AttemptKind, BranchOutput, GenerationAttempt};
use storyreel_core::SceneArtifact;
use storyreel_error::GenerationError;
use tracing::debug;

/// State of one branch (image or audio) of a scene.
#[derive(Debug, Clone)]
pub enum BranchState {
    /// No terminal outcome reported yet
    Pending,
    /// The branch produced its artifact
    Succeeded(BranchOutput),
    /// The branch exhausted retries or hit a permanent failure
    Failed(GenerationError),
}

/// Combined state of a scene's materialization.
#[derive(Debug, Clone)]
pub enum SceneState {
    /// At least one branch has not reached a terminal state
    Materializing,
    /// Both branches succeeded
    Ready(SceneArtifact),
    /// Either branch failed terminally
    Failed(GenerationError),
}

/// Tracks one scene from pending to `Ready` or `Failed`.
pub struct SceneMaterializer {
    index: usize,
    image: BranchState,
    audio: BranchState,
    image_attempt: GenerationAttempt,
    audio_attempt: GenerationAttempt,
}

impl SceneMaterializer {
    /// Create a materializer for one scene with both branches pending.
    pub fn new(index: usize) -> Self {
        Self {
            index,
            image: BranchState::Pending,
            audio: BranchState::Pending,
            image_attempt: GenerationAttempt::pending(index, AttemptKind::Image),
            audio_attempt: GenerationAttempt::pending(index, AttemptKind::Audio),
        }
    }

    /// Scene index this materializer tracks.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Attempt record for a branch.
    pub fn attempt(&self, kind: AttemptKind) -> &GenerationAttempt {
        match kind {
            AttemptKind::Image => &self.image_attempt,
            AttemptKind::Audio => &self.audio_attempt,
        }
    }

    fn branch_mut(&mut self, kind: AttemptKind) -> &mut BranchState {
        match kind {
            AttemptKind::Image => &mut self.image,
            AttemptKind::Audio => &mut self.audio,
        }
    }

    /// Record a branch success reported after `attempts` attempts.
    ///
    /// If the sibling branch already failed, the scene stays failed and the
    /// late artifact is simply recorded for diagnosis — the join rule never
    /// resurrects a failed scene.
    pub fn record_success(&mut self, kind: AttemptKind, output: BranchOutput, attempts: u32) {
        match kind {
            AttemptKind::Image => self.image_attempt.succeed(attempts),
            AttemptKind::Audio => self.audio_attempt.succeed(attempts),
        }
        if matches!(self.sibling(kind), BranchState::Failed(_)) {
            debug!(
                scene = self.index,
                kind = %kind,
                "Late {kind} success for already-failed scene; result discarded"
            );
        }
        *self.branch_mut(kind) = BranchState::Succeeded(output);
    }

    /// Record a terminal branch failure reported after `attempts` attempts.
    pub fn record_failure(&mut self, kind: AttemptKind, error: GenerationError, attempts: u32) {
        match kind {
            AttemptKind::Image => self.image_attempt.fail(attempts, error.clone()),
            AttemptKind::Audio => self.audio_attempt.fail(attempts, error.clone()),
        }
        *self.branch_mut(kind) = BranchState::Failed(error);
    }

    fn sibling(&self, kind: AttemptKind) -> &BranchState {
        match kind {
            AttemptKind::Image => &self.audio,
            AttemptKind::Audio => &self.image,
        }
    }

    /// True once the scene can no longer change state.
    ///
    /// A scene is terminal when both branches are terminal, or as soon as one
    /// branch fails (the sibling may still drain, but its result is moot).
    pub fn is_terminal(&self) -> bool {
        !matches!(self.state(), SceneState::Materializing)
    }

    /// Compute the combined scene state from the branch pair.
    ///
    /// The rule table, exhaustively:
    ///
    /// | image           | audio           | scene         |
    /// |-----------------|-----------------|---------------|
    /// | Succeeded       | Succeeded       | Ready         |
    /// | Failed          | any             | Failed        |
    /// | any             | Failed          | Failed        |
    /// | otherwise       | otherwise       | Materializing |
    pub fn state(&self) -> SceneState {
        match (&self.image, &self.audio) {
            (BranchState::Succeeded(image), BranchState::Succeeded(audio)) => {
                match (image, audio) {
                    (
                        BranchOutput::Image(image_ref),
                        BranchOutput::Audio { artifact, duration },
                    ) => SceneState::Ready(SceneArtifact::new(
                        self.index,
                        image_ref.clone(),
                        artifact.clone(),
                        *duration,
                    )),
                    // Branch outputs crossed kinds; only reachable through a
                    // pool bug, treated as a failed join.
                    _ => SceneState::Failed(GenerationError::new(
                        storyreel_error::GenerationErrorKind::InvalidInput(
                            "branch output kind mismatch".into(),
                        ),
                    )),
                }
            }
            (BranchState::Failed(error), _) => SceneState::Failed(error.clone()),
            (_, BranchState::Failed(error)) => SceneState::Failed(error.clone()),
            _ => SceneState::Materializing,
        }
    }

    /// The scene artifact, if the scene is `Ready`.
    pub fn artifact(&self) -> Option<SceneArtifact> {
        match self.state() {
            SceneState::Ready(artifact) => Some(artifact),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use storyreel_core::{ArtifactRef, MediaKind};
    use storyreel_error::GenerationErrorKind;

    fn image_output(artifact: ArtifactRef) -> BranchOutput {
        BranchOutput::Image(artifact)
    }

    fn audio_output(artifact: ArtifactRef, duration: Duration) -> BranchOutput {
        BranchOutput::Audio { artifact, duration }
    }

    fn artifact(kind: MediaKind) -> ArtifactRef {
        ArtifactRef::new(
            "deadbeef".into(),
            format!("/tmp/{kind}"),
            16,
            kind,
            match kind {
                MediaKind::Image => "image/png".into(),
                MediaKind::Audio => "audio/mpeg".into(),
                MediaKind::Video => "video/mp4".into(),
            },
        )
    }

    fn failure() -> GenerationError {
        GenerationError::new(GenerationErrorKind::RetriesExhausted {
            attempts: 4,
            last_error: "503".into(),
        })
    }

    #[test]
    fn both_branches_succeed_yields_ready() {
        let mut scene = SceneMaterializer::new(0);
        scene.record_success(AttemptKind::Image, image_output(artifact(MediaKind::Image)), 1);
        assert!(!scene.is_terminal());

        scene.record_success(
            AttemptKind::Audio,
            audio_output(artifact(MediaKind::Audio), Duration::from_secs_f64(3.5)),
            1,
        );
        let artifact = scene.artifact().expect("scene should be ready");
        assert_eq!(*artifact.index(), 0);
        assert_eq!(*artifact.audio_duration(), Duration::from_secs_f64(3.5));
    }

    #[test]
    fn audio_failure_is_terminal_for_the_scene() {
        let mut scene = SceneMaterializer::new(1);
        scene.record_failure(AttemptKind::Audio, failure(), 4);
        assert!(scene.is_terminal());
        assert!(matches!(scene.state(), SceneState::Failed(_)));
    }

    #[test]
    fn late_image_success_does_not_resurrect_failed_scene() {
        let mut scene = SceneMaterializer::new(2);
        // Audio exhausts retries first, then the image completes.
        scene.record_failure(AttemptKind::Audio, failure(), 4);
        scene.record_success(AttemptKind::Image, image_output(artifact(MediaKind::Image)), 2);

        assert!(matches!(scene.state(), SceneState::Failed(_)));
        assert!(scene.artifact().is_none());
    }

    #[test]
    fn late_audio_success_does_not_resurrect_failed_scene() {
        let mut scene = SceneMaterializer::new(3);
        scene.record_failure(AttemptKind::Image, failure(), 4);
        scene.record_success(
            AttemptKind::Audio,
            audio_output(artifact(MediaKind::Audio), Duration::from_secs(2)),
            1,
        );
        assert!(matches!(scene.state(), SceneState::Failed(_)));
    }

    #[test]
    fn single_branch_success_is_not_ready() {
        let mut scene = SceneMaterializer::new(4);
        scene.record_success(AttemptKind::Image, image_output(artifact(MediaKind::Image)), 1);
        assert!(matches!(scene.state(), SceneState::Materializing));
    }

    #[test]
    fn attempt_records_carry_reported_counts() {
        let mut scene = SceneMaterializer::new(5);
        scene.record_success(AttemptKind::Image, image_output(artifact(MediaKind::Image)), 3);
        scene.record_failure(AttemptKind::Audio, failure(), 4);
        assert_eq!(*scene.attempt(AttemptKind::Image).attempt_number(), 3);
        assert_eq!(*scene.attempt(AttemptKind::Audio).attempt_number(), 4);
        assert!(scene.attempt(AttemptKind::Audio).last_error().is_some());
    }
}
