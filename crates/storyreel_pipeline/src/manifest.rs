//! Persisted run manifest.
//!
//! One JSON record per production run: the script, every scene's terminal
//! outcome, the resolved cue sheet, and the output handle once produced.
//! Written atomically at each phase transition so a crashed or failed run can
//! always be diagnosed (and its assembly retried) from disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use storyreel_core::{
    ArtifactRef, CueSheet, RunId, RunStatus, SceneTerminalState, ScriptDescriptor,
};
use storyreel_error::{JsonError, StorageError, StorageErrorKind, StoryreelResult};
use tracing::debug;

/// The on-disk record of one production run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunManifest {
    /// Run identity
    pub run_id: RunId,
    /// Current (or terminal) run status
    pub status: RunStatus,
    /// The script being produced
    pub script: ScriptDescriptor,
    /// Terminal outcome per scene index; in-flight scenes are absent
    pub scene_states: BTreeMap<usize, SceneTerminalState>,
    /// The resolved schedule, once timing resolution has run
    pub cue_sheet: Option<CueSheet>,
    /// Durable handle to the encoded video, once produced
    pub output: Option<ArtifactRef>,
    /// Filesystem path of the final video, once written
    pub output_path: Option<String>,
    /// When the run started
    pub created_at: DateTime<Utc>,
    /// When this record was last written
    pub updated_at: DateTime<Utc>,
}

impl RunManifest {
    /// Create the initial manifest for a freshly started run.
    pub fn new(run_id: RunId, script: ScriptDescriptor) -> Self {
        let now = Utc::now();
        Self {
            run_id,
            status: RunStatus::Generating,
            script,
            scene_states: BTreeMap::new(),
            cue_sheet: None,
            output: None,
            output_path: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Manifest path inside a run directory.
    pub fn path_in(run_dir: &Path) -> PathBuf {
        run_dir.join("manifest.json")
    }

    /// Write the manifest atomically into `run_dir`.
    ///
    /// A partially written manifest is never observable: the record is
    /// written to a temporary file and renamed into place.
    pub async fn save(&mut self, run_dir: &Path) -> StoryreelResult<()> {
        self.updated_at = Utc::now();

        tokio::fs::create_dir_all(run_dir).await.map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                run_dir.display(),
                e
            )))
        })?;

        let json = serde_json::to_vec_pretty(self)
            .map_err(|e| JsonError::new(format!("Failed to serialize manifest: {}", e)))?;

        let path = Self::path_in(run_dir);
        let tmp = run_dir.join(format!(".manifest.{}.tmp", uuid::Uuid::new_v4()));
        tokio::fs::write(&tmp, &json).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                tmp.display(),
                e
            )))
        })?;
        tokio::fs::rename(&tmp, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;

        debug!(run_id = %self.run_id, path = %path.display(), status = %self.status, "Manifest written");
        Ok(())
    }

    /// Load a manifest from a run directory.
    pub async fn load(run_dir: &Path) -> StoryreelResult<Self> {
        let path = Self::path_in(run_dir);
        let json = tokio::fs::read(&path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileRead(format!(
                "{}: {}",
                path.display(),
                e
            )))
        })?;
        serde_json::from_slice(&json)
            .map_err(|e| JsonError::new(format!("Failed to parse manifest: {}", e)).into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeSet;
    use std::time::Duration;
    use storyreel_core::{CueSheetEntry, MediaKind, SceneSpec};

    fn script() -> ScriptDescriptor {
        ScriptDescriptor::from_scenes(
            "Test".into(),
            3,
            vec![SceneSpec::new(
                0,
                "n".into(),
                "p".into(),
                BTreeSet::new(),
            )],
        )
        .unwrap()
    }

    #[tokio::test]
    async fn manifest_round_trips_through_disk() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut manifest = RunManifest::new(RunId::generate(), script());
        manifest.status = RunStatus::Succeeded;
        manifest.scene_states.insert(0, SceneTerminalState::Ready);
        manifest.cue_sheet = Some(
            CueSheet::new(vec![CueSheetEntry::new(
                0,
                Duration::ZERO,
                Duration::from_secs(3),
            )])
            .unwrap(),
        );
        manifest.output = Some(ArtifactRef::new(
            "hash".into(),
            "/blobs/hash".into(),
            12,
            MediaKind::Video,
            "video/mp4".into(),
        ));
        manifest.save(dir.path()).await.unwrap();

        let loaded = RunManifest::load(dir.path()).await.unwrap();
        assert_eq!(loaded.run_id, manifest.run_id);
        assert_eq!(loaded.status, RunStatus::Succeeded);
        assert_eq!(loaded.scene_states, manifest.scene_states);
        assert_eq!(loaded.cue_sheet, manifest.cue_sheet);
        assert_eq!(loaded.output, manifest.output);
    }

    #[tokio::test]
    async fn save_overwrites_previous_record() {
        let dir = tempfile::TempDir::new().unwrap();
        let mut manifest = RunManifest::new(RunId::generate(), script());
        manifest.save(dir.path()).await.unwrap();

        manifest.status = RunStatus::Failed {
            reason: "1/1 scenes failed".into(),
        };
        manifest.save(dir.path()).await.unwrap();

        let loaded = RunManifest::load(dir.path()).await.unwrap();
        assert!(matches!(loaded.status, RunStatus::Failed { .. }));
    }
}
