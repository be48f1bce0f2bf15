//! Use cases
//!
//! Application-level operations that orchestrate domain logic.

pub mod discussion_hub;
pub mod run_scenario;
