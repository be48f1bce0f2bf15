//! Application layer for colloquy
//!
//! This crate runs discussions: one worker task per discussion owns its
//! orchestrator, a turn clock turns directives into timers, and events fan
//! out to subscribers. It also holds the ports infrastructure adapters
//! implement and the use cases the CLI drives. It depends only on the
//! domain layer.

pub mod config;
pub mod discussion;
pub mod ports;
pub mod use_cases;

// Re-export commonly used types
pub use config::{RuntimeConfig, ScenarioParams};
pub use discussion::{
    DiscussionHandle, DiscussionRuntimeError, EventEmitter, Operation, TurnClock,
};
pub use ports::{
    event_subscriber::{EventSubscriber, NoEventSubscriber},
    scoring::{ScoringError, ScoringProvider, ScoringRequest, ScoringResult},
    snapshot_store::{InMemorySnapshotStore, SnapshotStore, SnapshotStoreError},
};
pub use use_cases::discussion_hub::DiscussionHub;
pub use use_cases::run_scenario::{
    RunScenarioError, RunScenarioInput, RunScenarioOutput, RunScenarioUseCase,
};
