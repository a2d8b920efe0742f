//! Run identity, status, and per-scene terminal outcomes.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for one production run.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    PartialOrd,
    Ord,
    Serialize,
    Deserialize,
    derive_more::Display,
)]
pub struct RunId(Uuid);

impl RunId {
    /// Mint a fresh run id.
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::generate()
    }
}

/// Lifecycle state of a production run.
///
/// Transitions: `Generating` → `Assembling` → `Succeeded` | `Failed`;
/// generation may also fail directly. Terminal states are immutable history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, derive_more::Display)]
pub enum RunStatus {
    /// Scene fan-out in progress
    #[display("generating")]
    Generating,
    /// All required scenes ready; assembly in progress
    #[display("assembling")]
    Assembling,
    /// Final output durably written
    #[display("succeeded")]
    Succeeded,
    /// Run terminated without output
    #[display("failed ({})", reason)]
    Failed {
        /// User-visible failure summary, e.g. "2/5 scenes failed" or
        /// "assembly error: IntegrityDrift"
        reason: String,
    },
}

impl RunStatus {
    /// True for `Succeeded` and `Failed`.
    pub fn is_terminal(&self) -> bool {
        matches!(self, RunStatus::Succeeded | RunStatus::Failed { .. })
    }
}

/// Terminal outcome of one scene's materialization, as persisted in the
/// run manifest.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SceneTerminalState {
    /// Both sub-generations succeeded
    Ready,
    /// Image or audio failed terminally
    Failed {
        /// Message from the failing branch
        error: String,
        /// Attempts the failing branch consumed before giving up
        attempts: u32,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn terminal_statuses() {
        assert!(!RunStatus::Generating.is_terminal());
        assert!(!RunStatus::Assembling.is_terminal());
        assert!(RunStatus::Succeeded.is_terminal());
        assert!(
            RunStatus::Failed {
                reason: "2/5 scenes failed".into()
            }
            .is_terminal()
        );
    }

    #[test]
    fn failed_display_includes_reason() {
        let status = RunStatus::Failed {
            reason: "assembly error: IntegrityDrift".into(),
        };
        assert_eq!(format!("{status}"), "failed (assembly error: IntegrityDrift)");
    }
}
