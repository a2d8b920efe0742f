//! Completion events flowing from worker tasks to the coordinator.
//!
//! All shared per-scene state is updated through these events; workers never
//! touch the run aggregate directly.

use crate::AttemptKind;
use std::time::Duration;
use storyreel_core::ArtifactRef;
use storyreel_error::GenerationError;

/// The artifact produced by one successful branch.
#[derive(Debug, Clone)]
pub enum BranchOutput {
    /// Image branch output
    Image(ArtifactRef),
    /// Audio branch output with its measured duration
    Audio {
        /// Stored clip
        artifact: ArtifactRef,
        /// Duration measured from the produced clip
        duration: Duration,
    },
}

/// Terminal outcome of one (scene, kind) branch.
///
/// Exactly one event is emitted per branch: either the stored artifact or the
/// error that exhausted the branch.
#[derive(Debug)]
pub struct CompletionEvent {
    /// Scene the branch belongs to
    pub scene_index: usize,
    /// Image or audio
    pub kind: AttemptKind,
    /// Number of attempts consumed
    pub attempts: u32,
    /// The branch result
    pub outcome: Result<BranchOutput, GenerationError>,
}
