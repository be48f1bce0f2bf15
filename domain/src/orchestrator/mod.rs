//! Discussion orchestrator
//!
//! - [`machine::DiscussionOrchestrator`]: the per-discussion state machine
//! - [`outcome::Outcome`]: events and clock directive produced by an operation
//! - [`snapshot::OrchestratorSnapshot`]: persisted form, restorable bit-for-bit

pub mod machine;
pub mod outcome;
pub mod snapshot;
