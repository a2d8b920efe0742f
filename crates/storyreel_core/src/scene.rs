//! Scene model: scripts and their ordered scene descriptors.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use storyreel_error::{JsonError, RunError, RunErrorKind, StoryreelResult};

/// One indexed unit of a script requiring one image and one narration clip.
///
/// Immutable once parsed.
///
/// # Examples
///
/// ```
/// use storyreel_core::SceneSpec;
///
/// let scene = SceneSpec::new(
///     0,
///     "Our hero stares at three monitors.".to_string(),
///     "cluttered trading desk, late night, monitor glow".to_string(),
///     ["pose_03".to_string()].into_iter().collect(),
/// );
/// assert_eq!(*scene.index(), 0);
/// ```
#[derive(
    Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_new::new, derive_getters::Getters,
)]
pub struct SceneSpec {
    /// Position in canonical playback order
    index: usize,
    /// Text to be narrated over this scene
    narration_text: String,
    /// Prompt for the image generation collaborator
    visual_prompt: String,
    /// Reference IDs used for visual consistency across scenes
    style_refs: BTreeSet<String>,
}

/// On-disk script record, one per scene.
///
/// Mirrors the upload format: scenes carry no explicit index; position in the
/// list is the canonical order.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ShotRecord {
    narration: String,
    visual_prompt: String,
    #[serde(default)]
    style_refs: BTreeSet<String>,
}

/// On-disk script file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct ScriptFile {
    #[serde(default)]
    title: String,
    #[serde(default = "default_episode")]
    episode_number: u32,
    shots: Vec<ShotRecord>,
}

fn default_episode() -> u32 {
    1
}

/// A script decomposed into an ordered list of scene descriptors.
///
/// Invariant: scene indices are a dense 0-based sequence with no gaps. The
/// order is the canonical playback order and is never re-sorted by any later
/// stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ScriptDescriptor {
    /// Episode title, carried through to output naming and notification
    title: String,
    /// Episode number, carried through to output naming
    episode_number: u32,
    /// Ordered scene descriptors
    scenes: Vec<SceneSpec>,
}

impl ScriptDescriptor {
    /// Build a descriptor from already-indexed scenes, validating density.
    pub fn from_scenes(
        title: String,
        episode_number: u32,
        scenes: Vec<SceneSpec>,
    ) -> StoryreelResult<Self> {
        if scenes.is_empty() {
            Err(RunError::new(RunErrorKind::EmptyScript))?;
        }
        for (position, scene) in scenes.iter().enumerate() {
            if *scene.index() != position {
                Err(RunError::new(RunErrorKind::SparseIndices {
                    expected: position,
                    found: *scene.index(),
                }))?;
            }
        }
        Ok(Self {
            title,
            episode_number,
            scenes,
        })
    }

    /// Parse a script from its JSON upload format.
    ///
    /// Scene indices are assigned densely from list position.
    ///
    /// # Examples
    ///
    /// ```
    /// use storyreel_core::ScriptDescriptor;
    ///
    /// let json = r#"{
    ///     "title": "Hedge Fund Analyst",
    ///     "episode_number": 1,
    ///     "shots": [
    ///         {"narration": "You wake at 4am.", "visual_prompt": "dark bedroom, phone alarm"},
    ///         {"narration": "The terminal awaits.", "visual_prompt": "glowing monitors"}
    ///     ]
    /// }"#;
    /// let script = ScriptDescriptor::from_json(json).unwrap();
    /// assert_eq!(script.len(), 2);
    /// assert_eq!(*script.scenes()[1].index(), 1);
    /// ```
    pub fn from_json(json: &str) -> StoryreelResult<Self> {
        let file: ScriptFile = serde_json::from_str(json)
            .map_err(|e| JsonError::new(format!("Failed to parse script: {}", e)))?;

        let scenes = file
            .shots
            .into_iter()
            .enumerate()
            .map(|(index, shot)| {
                SceneSpec::new(index, shot.narration, shot.visual_prompt, shot.style_refs)
            })
            .collect();

        Self::from_scenes(file.title, file.episode_number, scenes)
    }

    /// Number of scenes in the script.
    pub fn len(&self) -> usize {
        self.scenes.len()
    }

    /// True when the script holds no scenes.
    ///
    /// Unreachable for descriptors built through the validating constructors,
    /// present for completeness.
    pub fn is_empty(&self) -> bool {
        self.scenes.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn scene(index: usize) -> SceneSpec {
        SceneSpec::new(
            index,
            format!("narration {index}"),
            format!("prompt {index}"),
            BTreeSet::new(),
        )
    }

    #[test]
    fn dense_indices_accepted() {
        let script =
            ScriptDescriptor::from_scenes("t".into(), 1, vec![scene(0), scene(1), scene(2)])
                .unwrap();
        assert_eq!(script.len(), 3);
    }

    #[test]
    fn sparse_indices_rejected() {
        let result = ScriptDescriptor::from_scenes("t".into(), 1, vec![scene(0), scene(2)]);
        assert!(result.is_err());
    }

    #[test]
    fn empty_script_rejected() {
        assert!(ScriptDescriptor::from_scenes("t".into(), 1, vec![]).is_err());
    }

    #[test]
    fn json_round_trip_assigns_positional_indices() {
        let json = r#"{
            "title": "Test",
            "shots": [
                {"narration": "a", "visual_prompt": "x", "style_refs": ["pose_00"]},
                {"narration": "b", "visual_prompt": "y"}
            ]
        }"#;
        let script = ScriptDescriptor::from_json(json).unwrap();
        assert_eq!(*script.episode_number(), 1);
        assert_eq!(*script.scenes()[0].index(), 0);
        assert_eq!(*script.scenes()[1].index(), 1);
        assert!(script.scenes()[0].style_refs().contains("pose_00"));
    }
}
