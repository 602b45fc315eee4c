//! Domain error taxonomy for the coordinator.
//!
//! Mirrors the seven-category error design: validation, resource conflicts,
//! external-process failures, timeouts, cancellation, transient storage
//! failures, and observability failures. Validation variants propagate to
//! callers without mutating state; agent-level failures are represented as
//! data (an `AgentRecord` in a terminal `Failed`/`Timeout` state) rather than
//! as `Err` values, so they never unwind past the orchestrator.

use thiserror::Error;
use uuid::Uuid;

/// Errors surfaced by the coordination engine's public operations.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoordinatorError {
    /// A task description was blank.
    #[error("task description is empty")]
    EmptyDescription,

    /// A `TaskProfile` dimension fell outside `[0, 1]`.
    #[error("profile dimension {dimension} out of range: {value}")]
    ProfileOutOfRange { dimension: &'static str, value: f64 },

    /// A prompt exceeded the executor's size limit.
    #[error("prompt length {0} exceeds maximum of 50000 characters")]
    PromptTooLong(usize),

    /// `record_outcome` received a quality/duration outside its valid range.
    #[error("invalid trust update: {0}")]
    InvalidTrustUpdate(String),

    /// A lock could not be acquired for one or more requested paths.
    #[error("lock conflict on {path}: held by agent {holder}")]
    LockConflict { path: String, holder: String },

    /// An agent id was not present in the registry.
    #[error("agent not found: {0}")]
    AgentNotFound(Uuid),

    /// An invalid agent lifecycle transition was attempted.
    #[error("invalid agent transition from {from:?} to {to:?}")]
    InvalidAgentTransition { from: String, to: String },

    /// The resolved model-invoker binary was missing or not executable.
    #[error("model invoker binary unavailable: {0}")]
    BinaryUnavailable(String),

    /// A session or agent was cancelled.
    #[error("cancelled")]
    Cancelled,

    /// A storage operation failed and was rolled back.
    #[error("storage error: {0}")]
    Storage(String),

    /// Configuration failed validation.
    #[error("configuration error: {0}")]
    Config(String),
}

impl CoordinatorError {
    /// Validation errors never mutate state and are safe to retry after
    /// correcting the input.
    pub const fn is_validation(&self) -> bool {
        matches!(
            self,
            Self::EmptyDescription
                | Self::ProfileOutOfRange { .. }
                | Self::PromptTooLong(_)
                | Self::InvalidTrustUpdate(_)
        )
    }

    /// Resource conflicts are non-fatal: the caller observes a failed
    /// agent/lock rather than an aborted session.
    pub const fn is_resource_conflict(&self) -> bool {
        matches!(self, Self::LockConflict { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_description_is_validation() {
        assert!(CoordinatorError::EmptyDescription.is_validation());
        assert!(!CoordinatorError::Cancelled.is_validation());
    }

    #[test]
    fn lock_conflict_is_resource_conflict() {
        let err = CoordinatorError::LockConflict {
            path: "/tmp/a".into(),
            holder: "agent-1".into(),
        };
        assert!(err.is_resource_conflict());
        assert!(!err.is_validation());
    }

    #[test]
    fn display_messages_are_stable() {
        assert_eq!(
            CoordinatorError::AgentNotFound(Uuid::nil()).to_string(),
            format!("agent not found: {}", Uuid::nil())
        );
    }
}
