//! Core data types for the Storyreel video pipeline.
//!
//! This crate provides the foundation data types shared across the Storyreel
//! workspace: the scene model, artifact references, the cue sheet, run
//! identity and status, configuration, and telemetry initialization.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod artifact;
mod config;
mod cue;
mod run;
mod scene;
mod telemetry;

pub use artifact::{ArtifactRef, MediaKind, SceneArtifact};
pub use config::{
    AssemblyConfig, GenerationConfig, NotifyConfig, RunConfig, StoryreelConfig, TimingConfig,
};
pub use cue::{CueSheet, CueSheetEntry};
pub use run::{RunId, RunStatus, SceneTerminalState};
pub use scene::{SceneSpec, ScriptDescriptor};
pub use telemetry::init_telemetry;
