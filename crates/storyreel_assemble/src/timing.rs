//! Deterministic timing resolution.

use std::time::Duration;
use storyreel_core::{CueSheet, CueSheetEntry, SceneArtifact, TimingConfig};
use storyreel_error::StoryreelResult;
use tracing::debug;

/// Resolves per-scene on-screen durations into a contiguous cue sheet.
///
/// Pure and deterministic given its inputs: arrival order never leaks into
/// the timeline because scenes are sorted by index before resolution. This
/// makes assembly retryable without re-running generation.
#[derive(Debug, Clone)]
pub struct TimingResolver {
    scene_floor: Duration,
    trailing_pad: Duration,
}

impl TimingResolver {
    /// Create a resolver from the timing configuration.
    pub fn new(config: &TimingConfig) -> Self {
        Self {
            scene_floor: config.scene_floor(),
            trailing_pad: config.trailing_pad(),
        }
    }

    /// Slot duration for one scene.
    ///
    /// The measured narration duration is raised to the scene floor so very
    /// short lines still register visually, then padded so the audio never
    /// cuts off at the slot boundary.
    fn slot_duration(&self, audio_duration: Duration) -> Duration {
        audio_duration.max(self.scene_floor) + self.trailing_pad
    }

    /// Resolve ready scene artifacts into a cue sheet.
    ///
    /// The input may cover a subset of the script's index range when failed
    /// scenes were skipped; surviving scenes pack together with no timing
    /// gap. An empty input is rejected.
    pub fn resolve(&self, artifacts: &[SceneArtifact]) -> StoryreelResult<CueSheet> {
        let mut ordered: Vec<&SceneArtifact> = artifacts.iter().collect();
        ordered.sort_by_key(|a| *a.index());

        let mut entries = Vec::with_capacity(ordered.len());
        let mut offset = Duration::ZERO;
        for artifact in ordered {
            let duration = self.slot_duration(*artifact.audio_duration());
            entries.push(CueSheetEntry::new(*artifact.index(), offset, duration));
            offset += duration;
        }

        let sheet = CueSheet::new(entries)?;
        debug!(
            scenes = sheet.len(),
            total_secs = sheet.total_duration().as_secs_f64(),
            "Resolved cue sheet"
        );
        Ok(sheet)
    }
}
