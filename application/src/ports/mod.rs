//! Port definitions (interfaces for external adapters)
//!
//! Ports define the contracts that infrastructure adapters must implement.

pub mod event_subscriber;
pub mod scoring;
pub mod snapshot_store;
