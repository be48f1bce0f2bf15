//! Turn-taking
//!
//! Strategy configuration, strategy memory, externally supplied scores, the
//! pure next-speaker selector and the directives handed to the runtime clock.

pub mod clock;
pub mod config;
pub mod scoring;
pub mod selection;
pub mod state;
