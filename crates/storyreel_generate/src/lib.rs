//! Scene fan-out generation for Storyreel.
//!
//! For every scene in a script this crate issues one image-generation request
//! and one audio-generation request, each drawn from a bounded pool per kind,
//! retries transient failures with exponential backoff, and reports every
//! terminal branch outcome as a completion event. The per-scene two-branch
//! join lives in [`SceneMaterializer`]; the fan-out itself in
//! [`GenerationWorkerPool`].

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod attempt;
mod event;
mod http;
mod materializer;
mod pool;
mod traits;

pub use attempt::{AttemptKind, AttemptState, GenerationAttempt};
pub use event::{BranchOutput, CompletionEvent};
pub use http::{HttpAudioGenerator, HttpImageGenerator};
pub use materializer::{BranchState, SceneMaterializer, SceneState};
pub use pool::GenerationWorkerPool;
pub use traits::{AudioGenerator, GeneratedAudio, GeneratedImage, ImageGenerator};
