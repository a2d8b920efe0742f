//! Generation errors and retry classification.
//!
//! Every failure returned by an image or audio generation collaborator is
//! classified as either transient (retryable with backoff) or permanent
//! (scene-fatal, never retried).

/// Generation-specific error conditions.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, derive_more::Display)]
pub enum GenerationErrorKind {
    /// Rate limited by the generation service
    #[display("Rate limited by generation service: {}", _0)]
    RateLimited(String),
    /// The attempt exceeded its hard timeout
    #[display("Generation attempt timed out after {}s", _0)]
    Timeout(u64),
    /// HTTP error with status code and message
    #[display("HTTP {} error: {}", status_code, message)]
    HttpError {
        /// HTTP status code
        status_code: u16,
        /// Error message
        message: String,
    },
    /// Transport-level failure (connect, DNS, broken stream)
    #[display("Transport failure: {}", _0)]
    Transport(String),
    /// The service rejected the request as malformed
    #[display("Invalid generation input: {}", _0)]
    InvalidInput(String),
    /// The service rejected the prompt for policy reasons
    #[display("Policy rejection: {}", _0)]
    PolicyRejection(String),
    /// A visual-consistency style reference was missing or unreadable
    #[display("Missing style reference: {}", _0)]
    MissingStyleReference(String),
    /// The service returned a success status but no usable artifact
    #[display("Empty response from generation service: {}", _0)]
    EmptyResponse(String),
    /// Response body could not be decoded
    #[display("Malformed response: {}", _0)]
    MalformedResponse(String),
    /// Persisting the produced artifact failed
    #[display("Failed to persist artifact: {}", _0)]
    ArtifactStore(String),
    /// All retry attempts were consumed
    #[display("Retries exhausted after {} attempts: {}", attempts, last_error)]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Message from the final attempt
        last_error: String,
    },
    /// The run was cancelled before this attempt started
    #[display("Attempt cancelled before start")]
    Cancelled,
}

impl GenerationErrorKind {
    /// Check if this error type should be retried.
    ///
    /// Transient errors (rate limits, timeouts, 5xx-equivalents) return true.
    /// Permanent errors (invalid input, policy rejection, missing references)
    /// immediately fail the owning scene.
    pub fn is_transient(&self) -> bool {
        match self {
            GenerationErrorKind::RateLimited(_) => true,
            GenerationErrorKind::Timeout(_) => true,
            GenerationErrorKind::Transport(_) => true,
            GenerationErrorKind::HttpError { status_code, .. } => {
                matches!(*status_code, 408 | 429 | 500 | 502 | 503 | 504)
            }
            GenerationErrorKind::EmptyResponse(_) => true,
            _ => false,
        }
    }

    /// Get retry strategy parameters for this error type.
    ///
    /// Returns `(initial_backoff_ms, max_delay_secs)`. The attempt ceiling is
    /// configured at the pool level rather than per error.
    pub fn retry_strategy_params(&self) -> (u64, u64) {
        match self {
            GenerationErrorKind::RateLimited(_) => (5000, 60),
            GenerationErrorKind::HttpError { status_code, .. } => match *status_code {
                429 => (5000, 60),
                503 => (2000, 60),
                500 | 502 | 504 => (1000, 8),
                408 => (2000, 30),
                _ => (2000, 60),
            },
            GenerationErrorKind::Timeout(_) => (2000, 30),
            _ => (2000, 60),
        }
    }
}

/// Generation error with source location tracking.
///
/// # Examples
///
/// ```
/// use storyreel_error::{GenerationError, GenerationErrorKind, RetryableError};
///
/// let err = GenerationError::new(GenerationErrorKind::PolicyRejection("unsafe prompt".into()));
/// assert!(!err.is_retryable());
/// ```
#[derive(Debug, Clone, derive_more::Display, derive_more::Error)]
#[display("Generation Error: {} at line {} in {}", kind, line, file)]
pub struct GenerationError {
    /// The kind of error that occurred
    pub kind: GenerationErrorKind,
    /// Line number where error was created
    pub line: u32,
    /// File where error was created
    pub file: &'static str,
}

impl GenerationError {
    /// Create a new GenerationError with automatic location tracking.
    #[track_caller]
    pub fn new(kind: GenerationErrorKind) -> Self {
        let location = std::panic::Location::caller();
        Self {
            kind,
            line: location.line(),
            file: location.file(),
        }
    }
}

/// Trait for errors that support retry logic.
///
/// Transient errors like 503 (service unavailable), 429 (rate limit) or
/// network timeouts should return true. Permanent errors like 400 (bad
/// request) or policy rejections should return false.
///
/// # Examples
///
/// ```
/// use storyreel_error::{GenerationError, GenerationErrorKind, RetryableError};
///
/// let err = GenerationError::new(GenerationErrorKind::HttpError {
///     status_code: 503,
///     message: "Service unavailable".to_string(),
/// });
///
/// assert!(err.is_retryable());
/// let (backoff, max_delay) = err.retry_strategy_params();
/// assert_eq!(backoff, 2000);
/// assert_eq!(max_delay, 60);
/// ```
pub trait RetryableError {
    /// Returns true if this error should trigger a retry.
    fn is_retryable(&self) -> bool;

    /// Get retry strategy parameters `(initial_backoff_ms, max_delay_secs)`.
    ///
    /// Override this to provide error-specific strategies:
    /// - Rate limit errors (429): longer delays
    /// - Server overload (503): standard delays, more patient
    /// - Server errors (500): quick retries, fail fast
    fn retry_strategy_params(&self) -> (u64, u64) {
        (2000, 60)
    }
}

impl RetryableError for GenerationError {
    fn is_retryable(&self) -> bool {
        self.kind.is_transient()
    }

    fn retry_strategy_params(&self) -> (u64, u64) {
        self.kind.retry_strategy_params()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transient_classification() {
        for status in [408, 429, 500, 502, 503, 504] {
            let kind = GenerationErrorKind::HttpError {
                status_code: status,
                message: "boom".into(),
            };
            assert!(kind.is_transient(), "status {status} should be transient");
        }
        for status in [400, 401, 403, 404, 422] {
            let kind = GenerationErrorKind::HttpError {
                status_code: status,
                message: "boom".into(),
            };
            assert!(!kind.is_transient(), "status {status} should be permanent");
        }
    }

    #[test]
    fn policy_and_reference_failures_are_permanent() {
        assert!(!GenerationErrorKind::PolicyRejection("nope".into()).is_transient());
        assert!(!GenerationErrorKind::InvalidInput("bad".into()).is_transient());
        assert!(!GenerationErrorKind::MissingStyleReference("pose_07".into()).is_transient());
        assert!(!GenerationErrorKind::Cancelled.is_transient());
    }

    #[test]
    fn timeout_is_transient() {
        assert!(GenerationErrorKind::Timeout(120).is_transient());
    }
}
