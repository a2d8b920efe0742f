//! Filesystem artifact store.
//!
//! Blobs live in a content-addressable structure organized by media kind and
//! content hash, with two-level subdirectories to prevent directory bloat:
//!
//! ```text
//! {base_path}/
//! ├── image/
//! │   └── ab/cd/abcdef123456...   (PNG file)
//! ├── audio/
//! │   └── 12/34/123456abcdef...   (MP3 file)
//! └── video/
//!     └── ef/01/ef0123456789...   (MP4 file)
//! ```
//!
//! Writes are atomic (temp file + rename); identical content deduplicates to
//! the same path.

use crate::ArtifactStore;
use sha2::{Digest, Sha256};
use std::path::{Path, PathBuf};
use storyreel_core::{ArtifactRef, MediaKind};
use storyreel_error::{StorageError, StorageErrorKind, StoryreelResult};
use uuid::Uuid;

/// Content-addressable filesystem storage backend.
pub struct FileSystemStore {
    base_path: PathBuf,
}

impl FileSystemStore {
    /// Create a new filesystem store, creating the base directory if needed.
    #[tracing::instrument(skip(base_path))]
    pub fn new(base_path: impl Into<PathBuf>) -> StoryreelResult<Self> {
        let base_path = base_path.into();

        std::fs::create_dir_all(&base_path).map_err(|e| {
            StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                "{}: {}",
                base_path.display(),
                e
            )))
        })?;

        tracing::debug!(path = %base_path.display(), "Opened filesystem artifact store");
        Ok(Self { base_path })
    }

    /// Compute SHA-256 hash of data.
    fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Path for a given hash and media kind:
    /// `{base}/{kind}/{hash[0:2]}/{hash[2:4]}/{hash}`.
    fn blob_path(&self, hash: &str, media_kind: MediaKind) -> PathBuf {
        self.base_path
            .join(media_kind.to_string())
            .join(&hash[0..2])
            .join(&hash[2..4])
            .join(hash)
    }

    fn verify_hash(data: &[u8], expected_hash: &str) -> StoryreelResult<()> {
        let actual_hash = Self::compute_hash(data);
        if actual_hash != expected_hash {
            Err(StorageError::new(StorageErrorKind::HashMismatch {
                expected: expected_hash.to_string(),
                actual: actual_hash,
            }))?;
        }
        Ok(())
    }

    async fn read_blob(&self, reference: &ArtifactRef) -> StoryreelResult<Vec<u8>> {
        let path = Path::new(reference.storage_path());
        let data = tokio::fs::read(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                StorageError::new(StorageErrorKind::NotFound(path.display().to_string()))
            } else {
                StorageError::new(StorageErrorKind::FileRead(format!(
                    "{}: {}",
                    path.display(),
                    e
                )))
            }
        })?;
        Self::verify_hash(&data, reference.content_hash())?;
        Ok(data)
    }
}

#[async_trait::async_trait]
impl ArtifactStore for FileSystemStore {
    #[tracing::instrument(skip(self, data), fields(size = data.len(), media_kind = %media_kind))]
    async fn store(
        &self,
        data: &[u8],
        media_kind: MediaKind,
        mime_type: &str,
    ) -> StoryreelResult<ArtifactRef> {
        let hash = Self::compute_hash(data);
        let path = self.blob_path(&hash, media_kind);

        // Identical content deduplicates to the existing blob.
        if tokio::fs::try_exists(&path).await.unwrap_or(false) {
            tracing::debug!(hash = %hash, "Artifact already stored, reusing blob");
            return Ok(ArtifactRef::new(
                hash,
                path.to_string_lossy().to_string(),
                data.len() as u64,
                media_kind,
                mime_type.to_string(),
            ));
        }

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }

        // Atomic write: temp file in the same directory, then rename.
        let temp_path = path.with_extension(format!("tmp-{}", Uuid::new_v4()));
        tokio::fs::write(&temp_path, data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                temp_path.display(),
                e
            )))
        })?;
        tokio::fs::rename(&temp_path, &path).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "rename {} -> {}: {}",
                temp_path.display(),
                path.display(),
                e
            )))
        })?;

        tracing::debug!(hash = %hash, path = %path.display(), "Stored artifact");

        Ok(ArtifactRef::new(
            hash,
            path.to_string_lossy().to_string(),
            data.len() as u64,
            media_kind,
            mime_type.to_string(),
        ))
    }

    #[tracing::instrument(skip(self, reference), fields(hash = %reference.content_hash()))]
    async fn retrieve(&self, reference: &ArtifactRef) -> StoryreelResult<Vec<u8>> {
        self.read_blob(reference).await
    }

    #[tracing::instrument(skip(self, reference), fields(hash = %reference.content_hash(), dest = %dest.display()))]
    async fn stage_to(&self, reference: &ArtifactRef, dest: &Path) -> StoryreelResult<()> {
        let data = self.read_blob(reference).await?;
        if let Some(parent) = dest.parent() {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                StorageError::new(StorageErrorKind::DirectoryCreation(format!(
                    "{}: {}",
                    parent.display(),
                    e
                )))
            })?;
        }
        tokio::fs::write(dest, &data).await.map_err(|e| {
            StorageError::new(StorageErrorKind::FileWrite(format!(
                "{}: {}",
                dest.display(),
                e
            )))
        })?;
        Ok(())
    }

    async fn exists(&self, reference: &ArtifactRef) -> bool {
        tokio::fs::try_exists(Path::new(reference.storage_path()))
            .await
            .unwrap_or(false)
    }
}
