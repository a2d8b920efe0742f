//! Top-level error wrapper types.

use crate::{
    AssemblyError, ConfigError, GenerationError, JsonError, NotifyError, RunError, StorageError,
};

/// This is the foundation error enum. Each Storyreel crate contributes the
/// variants for its own failure domain.
///
/// # Examples
///
/// ```
/// use storyreel_error::{StoryreelError, StorageError, StorageErrorKind};
///
/// let storage_err = StorageError::new(StorageErrorKind::NotFound("/blobs/ab".to_string()));
/// let err: StoryreelError = storage_err.into();
/// assert!(format!("{}", err).contains("Storage Error"));
/// ```
#[derive(Debug, derive_more::From, derive_more::Display, derive_more::Error)]
pub enum StoryreelErrorKind {
    /// JSON serialization/deserialization error
    #[from(JsonError)]
    Json(JsonError),
    /// Configuration error
    #[from(ConfigError)]
    Config(ConfigError),
    /// Artifact storage error
    #[from(StorageError)]
    Storage(StorageError),
    /// Image/audio generation error
    #[from(GenerationError)]
    Generation(GenerationError),
    /// Run-level coordination error
    #[from(RunError)]
    Run(RunError),
    /// Assembly/encoding error
    #[from(AssemblyError)]
    Assembly(AssemblyError),
    /// Notification error
    #[from(NotifyError)]
    Notify(NotifyError),
}

/// Storyreel error with kind discrimination.
///
/// # Examples
///
/// ```
/// use storyreel_error::{StoryreelResult, ConfigError};
///
/// fn might_fail() -> StoryreelResult<()> {
///     Err(ConfigError::new("Missing field"))?
/// }
///
/// match might_fail() {
///     Ok(_) => println!("Success"),
///     Err(e) => println!("Error: {}", e),
/// }
/// ```
#[derive(Debug, derive_more::Display, derive_more::Error)]
#[display("Storyreel Error: {}", _0)]
pub struct StoryreelError(Box<StoryreelErrorKind>);

impl StoryreelError {
    /// Create a new error from a kind.
    pub fn new(kind: StoryreelErrorKind) -> Self {
        Self(Box::new(kind))
    }

    /// Get the error kind.
    pub fn kind(&self) -> &StoryreelErrorKind {
        &self.0
    }
}

// Generic From implementation for any type that converts to StoryreelErrorKind
impl<T> From<T> for StoryreelError
where
    T: Into<StoryreelErrorKind>,
{
    fn from(err: T) -> Self {
        Self::new(err.into())
    }
}

/// Result type for Storyreel operations.
///
/// # Examples
///
/// ```
/// use storyreel_error::{StoryreelResult, JsonError};
///
/// fn parse_payload() -> StoryreelResult<String> {
///     Err(JsonError::new("unexpected end of input"))?
/// }
/// ```
pub type StoryreelResult<T> = std::result::Result<T, StoryreelError>;
