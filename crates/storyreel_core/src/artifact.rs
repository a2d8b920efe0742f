//! Artifact references: opaque handles to generated media.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use uuid::Uuid;

/// Type of generated media.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    strum::Display,
    strum::EnumString,
)]
#[strum(serialize_all = "lowercase")]
pub enum MediaKind {
    /// Still image for one scene
    Image,
    /// Narration audio clip for one scene
    Audio,
    /// Assembled video output
    Video,
}

/// Opaque handle to a stored artifact.
///
/// Contains everything needed to retrieve the blob from a storage backend
/// plus the measured metadata recorded at store time.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_getters::Getters)]
pub struct ArtifactRef {
    /// Unique identifier for this reference
    id: Uuid,
    /// SHA-256 hash of the content
    content_hash: String,
    /// Backend-specific path to the blob
    storage_path: String,
    /// Size of the blob in bytes
    size_bytes: u64,
    /// Type of media
    media_kind: MediaKind,
    /// MIME type (e.g. "image/png", "audio/mpeg")
    mime_type: String,
}

impl ArtifactRef {
    /// Create a reference with a fresh id.
    pub fn new(
        content_hash: String,
        storage_path: String,
        size_bytes: u64,
        media_kind: MediaKind,
        mime_type: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            content_hash,
            storage_path,
            size_bytes,
            media_kind,
            mime_type,
        }
    }
}

/// The completed materialization of one scene.
///
/// Created only once both sub-generations succeed. `audio_duration` is the
/// duration measured from the actual produced clip, never an estimate; the
/// whole timeline depends on it.
#[derive(
    Debug, Clone, PartialEq, Serialize, Deserialize, derive_new::new, derive_getters::Getters,
)]
pub struct SceneArtifact {
    /// Scene index this artifact pair belongs to
    index: usize,
    /// Handle to the generated image
    image: ArtifactRef,
    /// Handle to the generated narration clip
    audio: ArtifactRef,
    /// Measured duration of the narration clip
    audio_duration: Duration,
}
