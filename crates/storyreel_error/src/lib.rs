//! Error types for the Storyreel video pipeline.
//!
//! This crate provides the foundation error types used throughout the Storyreel workspace.
//!
//! # Error Hierarchy
//!
//! All errors follow the `ErrorKind` + wrapper struct pattern for clean error handling:
//! - `*ErrorKind` enum defines specific error conditions
//! - `*Error` struct wraps the kind with source location tracking
//! - All errors use `#[track_caller]` for automatic location capture
//!
//! # Examples
//!
//! ```
//! use storyreel_error::{StoryreelResult, ConfigError};
//!
//! fn load_settings() -> StoryreelResult<String> {
//!     Err(ConfigError::new("missing [assembly] section"))?
//! }
//!
//! match load_settings() {
//!     Ok(s) => println!("Got: {}", s),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assembly;
mod config;
mod error;
mod generation;
mod json;
mod notify;
mod run;
mod storage;

pub use assembly::{AssemblyError, AssemblyErrorKind};
pub use config::ConfigError;
pub use error::{StoryreelError, StoryreelErrorKind, StoryreelResult};
pub use generation::{GenerationError, GenerationErrorKind, RetryableError};
pub use json::JsonError;
pub use notify::NotifyError;
pub use run::{RunError, RunErrorKind};
pub use storage::{StorageError, StorageErrorKind};
