//! Timing resolution and video assembly for Storyreel.
//!
//! [`TimingResolver`] turns the set of ready scene artifacts into a
//! [`CueSheet`](storyreel_core::CueSheet): a contiguous, index-ordered
//! schedule computed purely from measured audio durations. [`MediaAssembler`]
//! stages the referenced blobs into a scratch directory, drives a
//! [`VideoEncoder`] to produce one continuous video, and verifies the encoded
//! output's duration against the cue sheet before accepting it.

#![forbid(unsafe_code)]
#![warn(missing_docs)]

mod assembler;
mod encoder;
mod timing;

pub use assembler::{AssemblyOutput, MediaAssembler};
pub use encoder::{
    EncodeOutput, EncodeRequest, EncodeSegment, EncodeSettings, FfmpegEncoder, VideoEncoder,
};
pub use timing::TimingResolver;
