//! Storyreel: a narrated video production pipeline.
//!
//! Feed it a script (an ordered list of scenes, each with narration text and
//! a visual prompt) and it generates one image and one narration clip per
//! scene through external collaborators, resolves a timing schedule from the
//! measured audio durations, and assembles one continuous video.
//!
//! This crate re-exports the workspace surface; see the member crates for
//! the implementations:
//! - [`storyreel_core`]: scenes, artifacts, cue sheets, configuration
//! - [`storyreel_storage`]: content-addressable artifact storage
//! - [`storyreel_generate`]: bounded-concurrency generation fan-out
//! - [`storyreel_assemble`]: timing resolution and ffmpeg assembly
//! - [`storyreel_pipeline`]: run coordination, manifests, notification

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub use storyreel_assemble::{
    AssemblyOutput, EncodeOutput, EncodeRequest, EncodeSegment, EncodeSettings, FfmpegEncoder,
    MediaAssembler, TimingResolver, VideoEncoder,
};
pub use storyreel_core::{
    ArtifactRef, AssemblyConfig, CueSheet, CueSheetEntry, GenerationConfig, MediaKind,
    NotifyConfig, RunConfig, RunId, RunStatus, SceneArtifact, SceneSpec, SceneTerminalState,
    ScriptDescriptor, StoryreelConfig, TimingConfig, init_telemetry,
};
pub use storyreel_error::{StoryreelError, StoryreelErrorKind, StoryreelResult};
pub use storyreel_generate::{
    AttemptKind, AudioGenerator, BranchOutput, CompletionEvent, GeneratedAudio, GeneratedImage,
    GenerationWorkerPool, HttpAudioGenerator, HttpImageGenerator, ImageGenerator,
    SceneMaterializer, SceneState,
};
pub use storyreel_pipeline::{
    NoopNotifier, Notifier, PipelineCoordinator, ProductionRun, RunManifest, RunNotice, RunReport,
    SlackNotifier,
};
pub use storyreel_storage::{ArtifactStore, FileSystemStore};
