//! HTTP clients for the image and audio generation collaborators.
//!
//! Both services speak a small JSON-over-HTTP contract. Status codes are
//! classified into transient and permanent failures; the retry policy itself
//! lives in the worker pool, not here.

use crate::{AudioGenerator, GeneratedAudio, GeneratedImage, ImageGenerator};
use async_trait::async_trait;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;
use storyreel_core::SceneSpec;
use storyreel_error::{GenerationError, GenerationErrorKind};
use tracing::instrument;

/// Inlined style reference image sent alongside an image request.
#[derive(Debug, Serialize)]
struct ReferenceImage {
    id: String,
    data_b64: String,
}

#[derive(Debug, Serialize)]
struct ImageRequest<'a> {
    scene_index: usize,
    visual_prompt: &'a str,
    style_refs: Vec<&'a str>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    reference_images: Vec<ReferenceImage>,
}

#[derive(Debug, Serialize)]
struct AudioRequest<'a> {
    scene_index: usize,
    narration: &'a str,
}

#[derive(Debug, Deserialize)]
struct AudioResponse {
    audio_b64: String,
    duration_secs: f64,
    #[serde(default = "default_audio_mime")]
    mime_type: String,
}

fn default_audio_mime() -> String {
    "audio/mpeg".to_string()
}

fn transport_error(e: reqwest::Error) -> GenerationError {
    GenerationError::new(GenerationErrorKind::Transport(e.to_string()))
}

/// Classify a non-success response into a generation error.
async fn classify_status(response: reqwest::Response) -> GenerationError {
    let status = response.status().as_u16();
    let message = response.text().await.unwrap_or_default();
    let kind = match status {
        400 => GenerationErrorKind::InvalidInput(message),
        403 | 422 => GenerationErrorKind::PolicyRejection(message),
        429 => GenerationErrorKind::RateLimited(message),
        _ => GenerationErrorKind::HttpError {
            status_code: status,
            message,
        },
    };
    GenerationError::new(kind)
}

/// Image generation collaborator over HTTP.
///
/// When a reference root is configured, each of the scene's style reference
/// IDs must resolve to `{root}/{id}.png`; the images are inlined into the
/// request for visual consistency across scenes. A missing or unreadable
/// reference is a permanent failure for the scene.
pub struct HttpImageGenerator {
    client: reqwest::Client,
    endpoint: String,
    reference_root: Option<PathBuf>,
}

impl HttpImageGenerator {
    /// Create a client for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
            reference_root: None,
        }
    }

    /// Resolve style reference IDs against a local reference directory.
    pub fn with_reference_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.reference_root = Some(root.into());
        self
    }

    async fn load_references(
        &self,
        scene: &SceneSpec,
    ) -> Result<Vec<ReferenceImage>, GenerationError> {
        let Some(root) = &self.reference_root else {
            return Ok(Vec::new());
        };
        let mut references = Vec::with_capacity(scene.style_refs().len());
        for id in scene.style_refs() {
            let path = root.join(format!("{id}.png"));
            let bytes = tokio::fs::read(&path).await.map_err(|e| {
                GenerationError::new(GenerationErrorKind::MissingStyleReference(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            })?;
            references.push(ReferenceImage {
                id: id.clone(),
                data_b64: BASE64.encode(&bytes),
            });
        }
        Ok(references)
    }
}

#[async_trait]
impl ImageGenerator for HttpImageGenerator {
    #[instrument(skip(self, scene), fields(scene = scene.index()))]
    async fn generate_image(&self, scene: &SceneSpec) -> Result<GeneratedImage, GenerationError> {
        let request = ImageRequest {
            scene_index: *scene.index(),
            visual_prompt: scene.visual_prompt(),
            style_refs: scene.style_refs().iter().map(String::as_str).collect(),
            reference_images: self.load_references(scene).await?,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(classify_status(response).await);
        }

        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("image/png")
            .to_string();

        let data = response.bytes().await.map_err(transport_error)?.to_vec();
        if data.is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::EmptyResponse(
                "image service returned an empty body".into(),
            )));
        }

        Ok(GeneratedImage::new(data, mime_type))
    }
}

/// Audio (narration) generation collaborator over HTTP.
///
/// The service returns the encoded clip plus the duration it measured from
/// the produced audio. That measured value drives the whole timeline; it is
/// validated here and never substituted with an estimate.
pub struct HttpAudioGenerator {
    client: reqwest::Client,
    endpoint: String,
}

impl HttpAudioGenerator {
    /// Create a client for the given endpoint.
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl AudioGenerator for HttpAudioGenerator {
    #[instrument(skip(self, scene), fields(scene = scene.index()))]
    async fn generate_audio(&self, scene: &SceneSpec) -> Result<GeneratedAudio, GenerationError> {
        let request = AudioRequest {
            scene_index: *scene.index(),
            narration: scene.narration_text(),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        if !response.status().is_success() {
            return Err(classify_status(response).await);
        }

        let body: AudioResponse = response.json().await.map_err(|e| {
            GenerationError::new(GenerationErrorKind::MalformedResponse(e.to_string()))
        })?;

        let data = BASE64.decode(&body.audio_b64).map_err(|e| {
            GenerationError::new(GenerationErrorKind::MalformedResponse(format!(
                "audio payload is not valid base64: {e}"
            )))
        })?;
        if data.is_empty() {
            return Err(GenerationError::new(GenerationErrorKind::EmptyResponse(
                "audio service returned an empty clip".into(),
            )));
        }
        if !body.duration_secs.is_finite() || body.duration_secs <= 0.0 {
            return Err(GenerationError::new(GenerationErrorKind::MalformedResponse(
                format!("invalid measured duration: {}", body.duration_secs),
            )));
        }

        Ok(GeneratedAudio::new(
            data,
            body.mime_type,
            Duration::from_secs_f64(body.duration_secs),
        ))
    }
}
