//! Run-level error types.

/// Kinds of run-level failures.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum RunErrorKind {
    /// More scenes failed than the configured skip allowance permits
    #[display("{}/{} scenes failed (allowed: {})", failed, total, allowed)]
    ThresholdExceeded {
        /// Number of scenes that reached terminal failure
        failed: usize,
        /// Total number of scenes in the script
        total: usize,
        /// Configured number of scenes that may be skipped
        allowed: usize,
    },
    /// The script contained no scenes
    #[display("Script contains no scenes")]
    EmptyScript,
    /// Scene indices were not a dense 0-based sequence
    #[display("Scene indices are not dense: expected {}, found {}", expected, found)]
    SparseIndices {
        /// The index expected at this position
        expected: usize,
        /// The index actually found
        found: usize,
    },
    /// The coordinator lost its completion event channel
    #[display("Completion channel closed with {} scenes outstanding", _0)]
    ChannelClosed(usize),
}

/// Run error with location tracking.
///
/// # Examples
///
/// ```
/// use storyreel_error::{RunError, RunErrorKind};
///
/// let err = RunError::new(RunErrorKind::ThresholdExceeded {
///     failed: 2,
///     total: 5,
///     allowed: 1,
/// });
/// assert!(format!("{}", err).contains("2/5 scenes failed"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Run Error: {} at line {} in {}", kind, line, file)]
pub struct RunError {
    /// The kind of error that occurred
    pub kind: RunErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl RunError {
    /// Create a new run error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: RunErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}
