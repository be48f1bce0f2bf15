//! Discussion aggregate
//!
//! This module contains the discussion root entity, its settings, and the
//! orchestrator-owned [`state::DiscussionState`].

pub mod entities;
pub mod settings;
pub mod state;
