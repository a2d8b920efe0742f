//! Assembly and encoding error types.

/// Kinds of assembly-stage failures.
///
/// All assembly errors are run-fatal: there is no partial video output.
#[derive(Debug, Clone, PartialEq, derive_more::Display)]
pub enum AssemblyErrorKind {
    /// The encoder process failed
    #[display("Encoding failed: {}", _0)]
    Encoding(String),
    /// The encoder could not be spawned
    #[display("Failed to launch encoder: {}", _0)]
    EncoderUnavailable(String),
    /// Encoded output duration drifted beyond tolerance from the cue sheet
    #[display(
        "Output duration {:.3}s drifted from cue sheet total {:.3}s (tolerance {:.3}s)",
        actual_secs,
        expected_secs,
        tolerance_secs
    )]
    IntegrityDrift {
        /// Total duration the cue sheet prescribes
        expected_secs: f64,
        /// Duration measured from the encoded output
        actual_secs: f64,
        /// Configured drift tolerance
        tolerance_secs: f64,
    },
    /// Probing the encoded output for its duration failed
    #[display("Failed to probe output duration: {}", _0)]
    Probe(String),
    /// The encode step exceeded its timeout
    #[display("Encode timed out after {}s", _0)]
    Timeout(u64),
    /// An artifact referenced by the cue sheet was missing
    #[display("Missing artifact for scene {}", _0)]
    MissingArtifact(usize),
    /// Scratch-workspace I/O failure
    #[display("Assembly I/O failure: {}", _0)]
    Io(String),
    /// The cue sheet was empty or violated its contiguity invariant
    #[display("Invalid cue sheet: {}", _0)]
    InvalidCueSheet(String),
}

/// Assembly error with location tracking.
///
/// # Examples
///
/// ```
/// use storyreel_error::{AssemblyError, AssemblyErrorKind};
///
/// let err = AssemblyError::new(AssemblyErrorKind::IntegrityDrift {
///     expected_secs: 6.5,
///     actual_secs: 7.2,
///     tolerance_secs: 0.2,
/// });
/// assert!(format!("{}", err).contains("drifted"));
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Assembly Error: {} at line {} in {}", kind, line, file)]
pub struct AssemblyError {
    /// The kind of error that occurred
    pub kind: AssemblyErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl AssemblyError {
    /// Create a new assembly error with automatic location tracking.
    #[track_caller]
    pub fn new(kind: AssemblyErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }

    /// True when a degraded-mode encode retry is worth attempting.
    ///
    /// Only encoder failures and timeouts qualify; integrity drift and
    /// missing artifacts would reproduce identically at lower resolution.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self.kind,
            AssemblyErrorKind::Encoding(_) | AssemblyErrorKind::Timeout(_)
        )
    }
}
