//! Cue sheet: the resolved per-scene start/duration schedule.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use storyreel_error::{AssemblyError, AssemblyErrorKind, StoryreelResult};

/// One resolved timeline slot.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    derive_new::new,
    derive_getters::Getters,
)]
pub struct CueSheetEntry {
    /// Scene index this slot plays
    scene_index: usize,
    /// Offset from timeline zero at which the slot begins
    start_offset: Duration,
    /// How long the slot holds on screen
    duration: Duration,
}

/// Resolved per-scene schedule driving assembly.
///
/// Read-only once computed. Invariant: entries are contiguous and
/// monotonically increasing — `start_offset[i+1] == start_offset[i] +
/// duration[i]`, entry 0 starts at zero, and scene indices are strictly
/// increasing (skipped scenes leave no timing gap).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CueSheet {
    entries: Vec<CueSheetEntry>,
}

impl CueSheet {
    /// Build a cue sheet, verifying the contiguity invariant.
    pub fn new(entries: Vec<CueSheetEntry>) -> StoryreelResult<Self> {
        if entries.is_empty() {
            Err(AssemblyError::new(AssemblyErrorKind::InvalidCueSheet(
                "cue sheet has no entries".into(),
            )))?;
        }
        if !entries[0].start_offset().is_zero() {
            Err(AssemblyError::new(AssemblyErrorKind::InvalidCueSheet(
                format!(
                    "first entry starts at {:?}, expected zero",
                    entries[0].start_offset()
                ),
            )))?;
        }
        for pair in entries.windows(2) {
            let (prev, next) = (&pair[0], &pair[1]);
            let expected = *prev.start_offset() + *prev.duration();
            if *next.start_offset() != expected {
                Err(AssemblyError::new(AssemblyErrorKind::InvalidCueSheet(
                    format!(
                        "entry for scene {} starts at {:?}, expected {:?}",
                        next.scene_index(),
                        next.start_offset(),
                        expected
                    ),
                )))?;
            }
            if next.scene_index() <= prev.scene_index() {
                Err(AssemblyError::new(AssemblyErrorKind::InvalidCueSheet(
                    format!(
                        "scene index {} follows {}; indices must strictly increase",
                        next.scene_index(),
                        prev.scene_index()
                    ),
                )))?;
            }
        }
        Ok(Self { entries })
    }

    /// The resolved slots in playback order.
    pub fn entries(&self) -> &[CueSheetEntry] {
        &self.entries
    }

    /// Number of slots.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Always false; kept for API symmetry with collections.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Total timeline duration.
    ///
    /// # Examples
    ///
    /// ```
    /// use std::time::Duration;
    /// use storyreel_core::{CueSheet, CueSheetEntry};
    ///
    /// let sheet = CueSheet::new(vec![
    ///     CueSheetEntry::new(0, Duration::ZERO, Duration::from_secs(2)),
    ///     CueSheetEntry::new(1, Duration::from_secs(2), Duration::from_secs(3)),
    /// ])
    /// .unwrap();
    /// assert_eq!(sheet.total_duration(), Duration::from_secs(5));
    /// ```
    pub fn total_duration(&self) -> Duration {
        self.entries
            .last()
            .map(|e| *e.start_offset() + *e.duration())
            .unwrap_or(Duration::ZERO)
    }

    /// The scene indices covered by this sheet, in playback order.
    pub fn scene_indices(&self) -> Vec<usize> {
        self.entries.iter().map(|e| *e.scene_index()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn secs(s: f64) -> Duration {
        Duration::from_secs_f64(s)
    }

    #[test]
    fn contiguous_sheet_accepted() {
        let sheet = CueSheet::new(vec![
            CueSheetEntry::new(0, secs(0.0), secs(2.0)),
            CueSheetEntry::new(1, secs(2.0), secs(3.5)),
            CueSheetEntry::new(2, secs(5.5), secs(1.0)),
        ])
        .unwrap();
        assert_eq!(sheet.total_duration(), secs(6.5));
        assert_eq!(sheet.scene_indices(), vec![0, 1, 2]);
    }

    #[test]
    fn gap_rejected() {
        let result = CueSheet::new(vec![
            CueSheetEntry::new(0, secs(0.0), secs(2.0)),
            CueSheetEntry::new(1, secs(2.5), secs(3.0)),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn nonzero_start_rejected() {
        let result = CueSheet::new(vec![CueSheetEntry::new(0, secs(1.0), secs(2.0))]);
        assert!(result.is_err());
    }

    #[test]
    fn duplicate_scene_index_rejected() {
        let result = CueSheet::new(vec![
            CueSheetEntry::new(0, secs(0.0), secs(2.0)),
            CueSheetEntry::new(0, secs(2.0), secs(1.0)),
        ]);
        assert!(result.is_err());
    }

    #[test]
    fn skipped_index_leaves_no_gap() {
        // Scene 1 was skipped; scene 2 follows scene 0 directly on the timeline.
        let sheet = CueSheet::new(vec![
            CueSheetEntry::new(0, secs(0.0), secs(2.0)),
            CueSheetEntry::new(2, secs(2.0), secs(1.0)),
        ])
        .unwrap();
        assert_eq!(sheet.total_duration(), secs(3.0));
    }

    #[test]
    fn empty_sheet_rejected() {
        assert!(CueSheet::new(vec![]).is_err());
    }
}
