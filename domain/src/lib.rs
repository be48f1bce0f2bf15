//! Domain layer for colloquy
//!
//! This crate contains the discussion turn orchestrator: entities, turn
//! strategies and the state machine. It is synchronous, performs no I/O and
//! takes the current time as an argument everywhere, so every decision is
//! reproducible from a snapshot.
//!
//! # Core Concepts
//!
//! ## Discussion
//!
//! A [`Discussion`] moves through statuses (`draft → active ⇄ paused →
//! completed | cancelled → archived`) and, orthogonally, phases
//! (`initialization → discussion → synthesis → conclusion`).
//!
//! ## Turns
//!
//! Exactly one participant holds the floor at a time under every strategy
//! except Free-Form. Who gets it next is decided by [`select_next`] from a
//! [`TurnStrategyConfig`]:
//!
//! - **Round Robin**: join order, deactivating chronically silent participants
//! - **Moderated**: a moderator picks, optionally with approval
//! - **Free-Form**: first come, first served, with a cooldown
//! - **Context-Aware**: weighted relevance, expertise and engagement scores
//! - **Priority-Based**: static priorities
//! - **Expertise-Driven**: topic keyword match, falling back to rotation
//!
//! ## Orchestrator
//!
//! [`DiscussionOrchestrator`] applies operations atomically and answers each
//! with an [`Outcome`]: the [`DiscussionEvent`]s to publish and a
//! [`ClockDirective`] for the runtime's turn clock.

pub mod core;
pub mod discussion;
pub mod event;
pub mod message;
pub mod orchestrator;
pub mod participant;
pub mod turn;
pub mod util;

// Re-export commonly used types
pub use core::{
    error::{OrchestratorError, TurnSnapshot},
    id::{AgentId, DiscussionId, EventId, MessageId, ParticipantId},
};
pub use discussion::{
    entities::{Discussion, DiscussionPhase, DiscussionStatus, DiscussionVisibility, NewDiscussion},
    settings::DiscussionSettings,
    state::{
        ActionItem, ActionItemStatus, CurrentTurn, Decision, DiscussionAnalysis, DiscussionState,
        KeyPoint,
    },
};
pub use event::{DiscussionEvent, DiscussionEventType, EventPayload, LeaveReason};
pub use message::{
    entities::{DiscussionMessage, EditRecord, MessageDraft, MessageType, Reaction},
    log::{MessageLog, MessageLogError},
};
pub use orchestrator::{
    machine::DiscussionOrchestrator,
    outcome::Outcome,
    snapshot::{OrchestratorSnapshot, SNAPSHOT_VERSION},
};
pub use participant::{
    entities::{
        DiscussionParticipant, NewParticipant, ParticipantAction, ParticipantPermissions,
        ParticipantRole,
    },
    registry::{JoinOutcome, ParticipantRegistry, RegistryError},
};
pub use turn::{
    clock::{ClockArm, ClockDirective, TimeoutKind},
    config::{
        ContextAwareConfig, ExpertiseDrivenConfig, FreeFormConfig, ModeratedConfig,
        ParticipantPriority, PriorityBasedConfig, RoundRobinConfig, TurnStrategyConfig,
        TurnStrategyKind,
    },
    scoring::{ParticipantScores, ScoringInputs, keyword_match},
    selection::{Selection, TurnContext, TurnEndReason, TurnSelection, select_next},
    state::StrategyState,
};
