//! Discussion messages
//!
//! [`log::MessageLog`] is append-only: edits keep history and deletion leaves
//! a tombstone.

pub mod entities;
pub mod log;
