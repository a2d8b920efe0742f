//! Content-addressable artifact storage for Storyreel.
//!
//! Generated images, narration clips, and assembled videos are stored by
//! SHA-256 content hash. Artifacts survive run failure so that every failed
//! run can be diagnosed from its retained intermediates.
//!
//! # Example
//!
//! ```rust
//! use storyreel_core::MediaKind;
//! use storyreel_storage::{ArtifactStore, FileSystemStore};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileSystemStore::new("/tmp/storyreel-artifacts")?;
//!
//! let data = vec![0u8; 1024]; // PNG bytes
//! let reference = store.store(&data, MediaKind::Image, "image/png").await?;
//!
//! let retrieved = store.retrieve(&reference).await?;
//! assert_eq!(data, retrieved);
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod filesystem;

pub use filesystem::FileSystemStore;
pub use storyreel_error::{StorageError, StorageErrorKind};

use std::path::Path;
use storyreel_core::{ArtifactRef, MediaKind};
use storyreel_error::StoryreelResult;

/// Trait for pluggable artifact storage backends.
///
/// Implementations store and retrieve binary artifact data; the returned
/// `ArtifactRef` is the opaque handle the rest of the pipeline passes around.
#[async_trait::async_trait]
pub trait ArtifactStore: Send + Sync {
    /// Store an artifact and return a reference to it.
    ///
    /// Implementations compute the content hash, write the blob atomically,
    /// and deduplicate identical content.
    async fn store(
        &self,
        data: &[u8],
        media_kind: MediaKind,
        mime_type: &str,
    ) -> StoryreelResult<ArtifactRef>;

    /// Retrieve an artifact's bytes by reference.
    async fn retrieve(&self, reference: &ArtifactRef) -> StoryreelResult<Vec<u8>>;

    /// Copy an artifact's blob to `dest` (e.g. into an assembly scratch
    /// directory), verifying its content hash on the way.
    async fn stage_to(&self, reference: &ArtifactRef, dest: &Path) -> StoryreelResult<()>;

    /// Check whether the blob behind a reference still exists.
    async fn exists(&self, reference: &ArtifactRef) -> bool;
}
