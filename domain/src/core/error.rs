//! Orchestrator error types
//!
//! Every rejection is local, synchronous, and non-retryable. Apart from input
//! validation failures, each variant carries a [`TurnSnapshot`] describing the
//! discussion at the moment of rejection so a client can resynchronize without
//! replaying history.

use crate::core::id::ParticipantId;
use crate::discussion::entities::{DiscussionPhase, DiscussionStatus};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Status, phase and current turn at the moment an operation was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TurnSnapshot {
    pub status: DiscussionStatus,
    pub phase: DiscussionPhase,
    pub current_speaker: Option<ParticipantId>,
    pub turn_number: u64,
}

impl std::fmt::Display for TurnSnapshot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "status={} phase={} turn={}",
            self.status.as_str(),
            self.phase.as_str(),
            self.turn_number
        )?;
        if let Some(speaker) = &self.current_speaker {
            write!(f, " speaker={}", speaker)?;
        }
        Ok(())
    }
}

/// Errors returned by orchestrator operations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum OrchestratorError {
    #[error("Invalid state: {message} [{context}]")]
    InvalidState {
        message: String,
        context: TurnSnapshot,
    },

    #[error("Turn violation: participant {participant} acted out of turn [{context}]")]
    TurnViolation {
        participant: ParticipantId,
        context: TurnSnapshot,
    },

    #[error("Participant {participant} is not eligible: {reason} [{context}]")]
    NotEligible {
        participant: ParticipantId,
        reason: String,
        context: TurnSnapshot,
    },

    #[error("No eligible participant remains [{context}]")]
    StrategyExhausted { context: TurnSnapshot },

    #[error("Conflict: {message} [{context}]")]
    Conflict {
        message: String,
        context: TurnSnapshot,
    },

    #[error("{resource} not found: {id} [{context}]")]
    NotFound {
        resource: &'static str,
        id: String,
        context: TurnSnapshot,
    },

    #[error("Validation failed: {0}")]
    InvalidInput(String),
}

impl OrchestratorError {
    /// Stable machine-readable code for this error kind.
    pub fn code(&self) -> &'static str {
        match self {
            OrchestratorError::InvalidState { .. } => "INVALID_STATE_ERROR",
            OrchestratorError::TurnViolation { .. } => "TURN_VIOLATION_ERROR",
            OrchestratorError::NotEligible { .. } => "NOT_ELIGIBLE_ERROR",
            OrchestratorError::StrategyExhausted { .. } => "STRATEGY_EXHAUSTED_ERROR",
            OrchestratorError::Conflict { .. } => "CONFLICT_ERROR",
            OrchestratorError::NotFound { .. } => "NOT_FOUND_ERROR",
            OrchestratorError::InvalidInput(_) => "VALIDATION_ERROR",
        }
    }

    /// The orchestrator never retries, and none of its decisions change on retry.
    pub fn is_retryable(&self) -> bool {
        false
    }

    /// Whether this error signals the natural end of the discussion rather than a failure.
    pub fn is_conclusion(&self) -> bool {
        matches!(self, OrchestratorError::StrategyExhausted { .. })
    }

    /// Discussion state at the time of rejection, when known.
    pub fn context(&self) -> Option<&TurnSnapshot> {
        match self {
            OrchestratorError::InvalidState { context, .. }
            | OrchestratorError::TurnViolation { context, .. }
            | OrchestratorError::NotEligible { context, .. }
            | OrchestratorError::StrategyExhausted { context }
            | OrchestratorError::Conflict { context, .. }
            | OrchestratorError::NotFound { context, .. } => Some(context),
            OrchestratorError::InvalidInput(_) => None,
        }
    }
}

/// Result alias for orchestrator operations
pub type Result<T> = std::result::Result<T, OrchestratorError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> TurnSnapshot {
        TurnSnapshot {
            status: DiscussionStatus::Active,
            phase: DiscussionPhase::Discussion,
            current_speaker: Some(ParticipantId::new("p-1")),
            turn_number: 4,
        }
    }

    #[test]
    fn test_turn_violation_display_includes_context() {
        let error = OrchestratorError::TurnViolation {
            participant: ParticipantId::new("p-2"),
            context: context(),
        };
        assert_eq!(
            error.to_string(),
            "Turn violation: participant p-2 acted out of turn \
             [status=active phase=discussion turn=4 speaker=p-1]"
        );
    }

    #[test]
    fn test_codes() {
        assert_eq!(
            OrchestratorError::StrategyExhausted { context: context() }.code(),
            "STRATEGY_EXHAUSTED_ERROR"
        );
        assert_eq!(
            OrchestratorError::InvalidInput("x".into()).code(),
            "VALIDATION_ERROR"
        );
    }

    #[test]
    fn test_exhausted_is_conclusion_not_retryable() {
        let error = OrchestratorError::StrategyExhausted { context: context() };
        assert!(error.is_conclusion());
        assert!(!error.is_retryable());
        assert!(!OrchestratorError::InvalidInput("x".into()).is_conclusion());
    }

    #[test]
    fn test_context_accessor() {
        let error = OrchestratorError::Conflict {
            message: "dup".into(),
            context: context(),
        };
        assert_eq!(error.context().unwrap().turn_number, 4);
        assert!(OrchestratorError::InvalidInput("x".into()).context().is_none());
    }
}
