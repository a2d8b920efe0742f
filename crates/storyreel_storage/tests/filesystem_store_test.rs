//! Integration tests for the filesystem artifact store.

use storyreel_core::MediaKind;
use storyreel_storage::{ArtifactStore, FileSystemStore};
use tempfile::TempDir;

#[tokio::test]
async fn store_and_retrieve_round_trip() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemStore::new(dir.path()).unwrap();

    let data = b"not really a png".to_vec();
    let reference = store.store(&data, MediaKind::Image, "image/png").await.unwrap();

    assert_eq!(*reference.size_bytes(), data.len() as u64);
    assert_eq!(*reference.media_kind(), MediaKind::Image);
    assert!(store.exists(&reference).await);

    let retrieved = store.retrieve(&reference).await.unwrap();
    assert_eq!(retrieved, data);
}

#[tokio::test]
async fn identical_content_deduplicates() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemStore::new(dir.path()).unwrap();

    let data = b"same bytes".to_vec();
    let first = store.store(&data, MediaKind::Audio, "audio/mpeg").await.unwrap();
    let second = store.store(&data, MediaKind::Audio, "audio/mpeg").await.unwrap();

    assert_eq!(first.content_hash(), second.content_hash());
    assert_eq!(first.storage_path(), second.storage_path());
    // References stay distinct even when blobs dedupe.
    assert_ne!(first.id(), second.id());
}

#[tokio::test]
async fn media_kinds_partition_the_tree() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemStore::new(dir.path()).unwrap();

    let data = b"shared".to_vec();
    let image = store.store(&data, MediaKind::Image, "image/png").await.unwrap();
    let audio = store.store(&data, MediaKind::Audio, "audio/mpeg").await.unwrap();

    assert_eq!(image.content_hash(), audio.content_hash());
    assert_ne!(image.storage_path(), audio.storage_path());
}

#[tokio::test]
async fn stage_to_copies_blob_out() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemStore::new(dir.path()).unwrap();

    let data = b"clip".to_vec();
    let reference = store.store(&data, MediaKind::Audio, "audio/mpeg").await.unwrap();

    let scratch = TempDir::new().unwrap();
    let dest = scratch.path().join("narration_000.mp3");
    store.stage_to(&reference, &dest).await.unwrap();
    assert_eq!(std::fs::read(&dest).unwrap(), data);
}

#[tokio::test]
async fn retrieve_detects_corruption() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemStore::new(dir.path()).unwrap();

    let reference = store
        .store(b"original", MediaKind::Image, "image/png")
        .await
        .unwrap();
    std::fs::write(reference.storage_path(), b"tampered").unwrap();

    assert!(store.retrieve(&reference).await.is_err());
}

#[tokio::test]
async fn retrieve_missing_blob_errors() {
    let dir = TempDir::new().unwrap();
    let store = FileSystemStore::new(dir.path()).unwrap();

    let reference = store
        .store(b"ephemeral", MediaKind::Video, "video/mp4")
        .await
        .unwrap();
    std::fs::remove_file(reference.storage_path()).unwrap();

    assert!(!store.exists(&reference).await);
    assert!(store.retrieve(&reference).await.is_err());
}
