//! Core domain concepts shared across all subdomains.
//!
//! - [`id`]: identifier value objects (discussion, participant, agent, message, event)
//! - [`error::OrchestratorError`]: the typed rejection taxonomy

pub mod error;
pub mod id;
