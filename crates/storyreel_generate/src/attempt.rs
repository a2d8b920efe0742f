//! Per-(scene, kind) attempt tracking.

use storyreel_error::GenerationError;

/// Which sub-generation an attempt belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, strum::Display)]
#[strum(serialize_all = "lowercase")]
pub enum AttemptKind {
    /// Image sub-generation
    Image,
    /// Audio sub-generation
    Audio,
}

/// Terminal state of one generation branch's attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, strum::Display)]
#[strum(serialize_all = "snake_case")]
pub enum AttemptState {
    /// No terminal outcome reported yet
    Pending,
    /// The branch produced an artifact
    Succeeded,
    /// The branch exhausted retries or hit a permanent failure
    Failed,
}

/// Record of one (scene, kind) branch's attempts.
///
/// Workers own their retry loops; the count of attempts they consumed rides
/// the branch's completion event and is folded in here when the terminal
/// outcome is recorded. Cancelled branches report zero attempts.
#[derive(Debug, Clone, derive_getters::Getters)]
pub struct GenerationAttempt {
    /// Scene this attempt serves
    scene_index: usize,
    /// Image or audio
    kind: AttemptKind,
    /// Attempts consumed by the branch, as reported at completion
    attempt_number: u32,
    /// Current state
    state: AttemptState,
    /// Error from the terminal failure, if any
    last_error: Option<GenerationError>,
}

impl GenerationAttempt {
    /// Create the initial pending record for a (scene, kind) pair.
    pub fn pending(scene_index: usize, kind: AttemptKind) -> Self {
        Self {
            scene_index,
            kind,
            attempt_number: 0,
            state: AttemptState::Pending,
            last_error: None,
        }
    }

    /// Record that the branch succeeded after `attempts` attempts.
    pub fn succeed(&mut self, attempts: u32) {
        self.attempt_number = attempts;
        self.state = AttemptState::Succeeded;
    }

    /// Record that the branch failed terminally after `attempts` attempts.
    pub fn fail(&mut self, attempts: u32, error: GenerationError) {
        self.attempt_number = attempts;
        self.state = AttemptState::Failed;
        self.last_error = Some(error);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use storyreel_error::GenerationErrorKind;

    #[test]
    fn attempt_lifecycle() {
        let mut attempt = GenerationAttempt::pending(3, AttemptKind::Image);
        assert_eq!(*attempt.state(), AttemptState::Pending);
        assert_eq!(*attempt.attempt_number(), 0);

        attempt.succeed(2);
        assert_eq!(*attempt.state(), AttemptState::Succeeded);
        assert_eq!(*attempt.attempt_number(), 2);
    }

    #[test]
    fn failure_keeps_the_terminal_error() {
        let mut attempt = GenerationAttempt::pending(1, AttemptKind::Audio);
        attempt.fail(4, GenerationError::new(GenerationErrorKind::Timeout(120)));
        assert_eq!(*attempt.state(), AttemptState::Failed);
        assert_eq!(*attempt.attempt_number(), 4);
        assert!(attempt.last_error().is_some());
    }

    #[test]
    fn cancelled_branches_report_zero_attempts() {
        let mut attempt = GenerationAttempt::pending(0, AttemptKind::Image);
        attempt.fail(0, GenerationError::new(GenerationErrorKind::Cancelled));
        assert_eq!(*attempt.attempt_number(), 0);
    }
}
