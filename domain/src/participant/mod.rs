//! Participant domain
//!
//! Participants, their roles and permissions, and the per-discussion
//! [`registry::ParticipantRegistry`] whose join order is the canonical
//! rotation order for turn strategies.

pub mod entities;
pub mod registry;
