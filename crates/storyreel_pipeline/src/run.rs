//! The per-run aggregate: one materializer per scene.

use std::collections::BTreeMap;
use storyreel_core::{RunId, RunStatus, SceneArtifact, SceneTerminalState, ScriptDescriptor};
use storyreel_generate::{
    AttemptKind, AttemptState, CompletionEvent, SceneMaterializer, SceneState,
};
use tracing::debug;

/// Aggregate state of one production run.
///
/// Holds the script, the run status, and one [`SceneMaterializer`] per scene.
/// All mutation flows through [`apply_event`](Self::apply_event); workers
/// never touch this state directly.
pub struct ProductionRun {
    run_id: RunId,
    script: ScriptDescriptor,
    status: RunStatus,
    scenes: BTreeMap<usize, SceneMaterializer>,
}

impl ProductionRun {
    /// Start a run for a script, all scenes pending.
    pub fn new(script: ScriptDescriptor) -> Self {
        let scenes = script
            .scenes()
            .iter()
            .map(|scene| (*scene.index(), SceneMaterializer::new(*scene.index())))
            .collect();
        Self {
            run_id: RunId::generate(),
            script,
            status: RunStatus::Generating,
            scenes,
        }
    }

    /// This run's identifier.
    pub fn run_id(&self) -> RunId {
        self.run_id
    }

    /// The script this run is producing.
    pub fn script(&self) -> &ScriptDescriptor {
        &self.script
    }

    /// Current run status.
    pub fn status(&self) -> &RunStatus {
        &self.status
    }

    /// Advance the run status.
    pub fn set_status(&mut self, status: RunStatus) {
        debug!(run_id = %self.run_id, from = %self.status, to = %status, "Run status change");
        self.status = status;
    }

    /// Fold one branch completion into the owning scene's materializer.
    ///
    /// Events for unknown scene indices are ignored; the pool only ever
    /// spawns branches for scenes this run created.
    pub fn apply_event(&mut self, event: CompletionEvent) {
        let Some(scene) = self.scenes.get_mut(&event.scene_index) else {
            debug!(scene = event.scene_index, "Event for unknown scene dropped");
            return;
        };
        match event.outcome {
            Ok(output) => scene.record_success(event.kind, output, event.attempts),
            Err(error) => scene.record_failure(event.kind, error, event.attempts),
        }
    }

    /// Materializer for one scene, if the script has that index.
    pub fn scene(&self, index: usize) -> Option<&SceneMaterializer> {
        self.scenes.get(&index)
    }

    /// Number of scenes in the script.
    pub fn total_scenes(&self) -> usize {
        self.scenes.len()
    }

    /// Scenes currently in a terminal `Failed` state.
    pub fn failed_scenes(&self) -> usize {
        self.scenes
            .values()
            .filter(|s| matches!(s.state(), SceneState::Failed(_)))
            .count()
    }

    /// Scenes that reached `Ready`.
    pub fn ready_scenes(&self) -> usize {
        self.scenes
            .values()
            .filter(|s| matches!(s.state(), SceneState::Ready(_)))
            .count()
    }

    /// True once no scene can change state any further.
    pub fn all_scenes_terminal(&self) -> bool {
        self.scenes.values().all(|s| s.is_terminal())
    }

    /// Scenes not yet terminal.
    pub fn outstanding_scenes(&self) -> usize {
        self.scenes.values().filter(|s| !s.is_terminal()).count()
    }

    /// The artifacts of every `Ready` scene, in index order.
    pub fn ready_artifacts(&self) -> Vec<SceneArtifact> {
        self.scenes.values().filter_map(|s| s.artifact()).collect()
    }

    /// Per-scene terminal outcomes for manifest persistence.
    ///
    /// Scenes still materializing are omitted; the manifest records history,
    /// not in-flight state.
    pub fn terminal_states(&self) -> BTreeMap<usize, SceneTerminalState> {
        self.scenes
            .iter()
            .filter_map(|(index, scene)| match scene.state() {
                SceneState::Ready(_) => Some((*index, SceneTerminalState::Ready)),
                SceneState::Failed(error) => Some((
                    *index,
                    SceneTerminalState::Failed {
                        error: error.to_string(),
                        attempts: failed_branch_attempts(scene),
                    },
                )),
                SceneState::Materializing => None,
            })
            .collect()
    }
}

/// Attempts consumed by the scene's failing branch. When both branches
/// failed, the larger count is the interesting one.
fn failed_branch_attempts(scene: &SceneMaterializer) -> u32 {
    [AttemptKind::Image, AttemptKind::Audio]
        .into_iter()
        .map(|kind| scene.attempt(kind))
        .filter(|attempt| *attempt.state() == AttemptState::Failed)
        .map(|attempt| *attempt.attempt_number())
        .max()
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use storyreel_core::{ArtifactRef, MediaKind, SceneSpec};
    use storyreel_error::{GenerationError, GenerationErrorKind};
    use storyreel_generate::{AttemptKind, BranchOutput};

    fn script(n: usize) -> ScriptDescriptor {
        let scenes = (0..n)
            .map(|i| SceneSpec::new(i, format!("n{i}"), format!("p{i}"), BTreeSet::new()))
            .collect();
        ScriptDescriptor::from_scenes("t".into(), 1, scenes).unwrap()
    }

    fn artifact(kind: MediaKind) -> ArtifactRef {
        ArtifactRef::new("h".into(), "/a/h".into(), 4, kind, "x/y".into())
    }

    fn success(scene_index: usize, kind: AttemptKind) -> CompletionEvent {
        let outcome = match kind {
            AttemptKind::Image => BranchOutput::Image(artifact(MediaKind::Image)),
            AttemptKind::Audio => BranchOutput::Audio {
                artifact: artifact(MediaKind::Audio),
                duration: Duration::from_secs(2),
            },
        };
        CompletionEvent {
            scene_index,
            kind,
            attempts: 1,
            outcome: Ok(outcome),
        }
    }

    fn failure(scene_index: usize, kind: AttemptKind) -> CompletionEvent {
        CompletionEvent {
            scene_index,
            kind,
            attempts: 4,
            outcome: Err(GenerationError::new(
                GenerationErrorKind::RetriesExhausted {
                    attempts: 4,
                    last_error: "503".into(),
                },
            )),
        }
    }

    #[test]
    fn events_fold_into_scene_states_in_any_order() {
        let mut run = ProductionRun::new(script(3));
        // Completions arrive shuffled across scenes and kinds.
        run.apply_event(success(2, AttemptKind::Audio));
        run.apply_event(success(0, AttemptKind::Image));
        run.apply_event(success(1, AttemptKind::Image));
        run.apply_event(success(2, AttemptKind::Image));
        run.apply_event(success(0, AttemptKind::Audio));
        assert!(!run.all_scenes_terminal());
        assert_eq!(run.outstanding_scenes(), 1);

        run.apply_event(success(1, AttemptKind::Audio));
        assert!(run.all_scenes_terminal());
        assert_eq!(run.ready_scenes(), 3);

        let artifacts = run.ready_artifacts();
        let indices: Vec<usize> = artifacts.iter().map(|a| *a.index()).collect();
        assert_eq!(indices, vec![0, 1, 2]);
    }

    #[test]
    fn failed_branch_makes_scene_terminal_before_sibling_reports() {
        let mut run = ProductionRun::new(script(2));
        run.apply_event(failure(0, AttemptKind::Audio));
        assert_eq!(run.failed_scenes(), 1);
        assert_eq!(run.outstanding_scenes(), 1);

        // The sibling drains afterwards; the scene stays failed.
        run.apply_event(success(0, AttemptKind::Image));
        assert_eq!(run.failed_scenes(), 1);
        assert!(run.ready_artifacts().is_empty());
    }

    #[test]
    fn attempt_counts_from_events_land_in_scene_records() {
        let mut run = ProductionRun::new(script(1));
        run.apply_event(success(0, AttemptKind::Image));
        run.apply_event(failure(0, AttemptKind::Audio));

        let scene = run.scene(0).unwrap();
        assert_eq!(*scene.attempt(AttemptKind::Image).attempt_number(), 1);
        assert_eq!(*scene.attempt(AttemptKind::Audio).attempt_number(), 4);

        // The failing branch's count lands in the persisted terminal state.
        let states = run.terminal_states();
        assert!(matches!(
            states.get(&0),
            Some(SceneTerminalState::Failed { attempts: 4, .. })
        ));
    }

    #[test]
    fn terminal_states_omit_in_flight_scenes() {
        let mut run = ProductionRun::new(script(2));
        run.apply_event(success(0, AttemptKind::Image));
        run.apply_event(success(0, AttemptKind::Audio));
        let states = run.terminal_states();
        assert_eq!(states.len(), 1);
        assert_eq!(states.get(&0), Some(&SceneTerminalState::Ready));
    }
}
