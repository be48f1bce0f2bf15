//! Discussion runtime
//!
//! Each live discussion is an actor: a worker task owning the orchestrator,
//! a [`DiscussionHandle`] to talk to it, a [`TurnClock`] for its timers and a
//! shared [`EventEmitter`] for its events.

pub mod clock;
pub mod command;
pub mod emitter;
pub mod error;
pub mod handle;
pub(crate) mod worker;

pub use clock::TurnClock;
pub use command::{Command, Operation};
pub use emitter::EventEmitter;
pub use error::DiscussionRuntimeError;
pub use handle::DiscussionHandle;
