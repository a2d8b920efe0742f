//! Generator collaborator traits.
//!
//! The image and audio services are independent external collaborators; the
//! pipeline only sees these traits. Implementations return raw bytes plus the
//! metadata measured by the service — for audio, the actual clip duration,
//! which the whole timeline depends on.

use async_trait::async_trait;
use std::time::Duration;
use storyreel_core::SceneSpec;
use storyreel_error::GenerationError;

/// A generated still image.
#[derive(Debug, Clone, derive_new::new, derive_getters::Getters)]
pub struct GeneratedImage {
    /// Encoded image bytes
    data: Vec<u8>,
    /// MIME type of the encoding
    mime_type: String,
}

/// A generated narration clip with its measured duration.
#[derive(Debug, Clone, derive_new::new, derive_getters::Getters)]
pub struct GeneratedAudio {
    /// Encoded audio bytes
    data: Vec<u8>,
    /// MIME type of the encoding
    mime_type: String,
    /// Duration measured from the produced clip, never estimated
    duration: Duration,
}

/// Image generation collaborator.
#[async_trait]
pub trait ImageGenerator: Send + Sync {
    /// Generate one image for a scene.
    ///
    /// The scene's `style_refs` identify the visual-consistency references the
    /// service must honor; a missing or unreadable reference is a permanent
    /// failure for the scene.
    async fn generate_image(&self, scene: &SceneSpec) -> Result<GeneratedImage, GenerationError>;
}

/// Audio (narration) generation collaborator.
#[async_trait]
pub trait AudioGenerator: Send + Sync {
    /// Generate one narration clip for a scene.
    async fn generate_audio(&self, scene: &SceneSpec) -> Result<GeneratedAudio, GenerationError>;
}
