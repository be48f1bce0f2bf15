//! Clock directives
//!
//! The orchestrator never sleeps. Each operation tells the runtime's turn
//! clock what to do next; the clock reports back with the generation it was
//! armed with, and anything older than the current generation is ignored.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Which of the two turn timers fired
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TimeoutKind {
    /// Maximum turn duration elapsed
    Turn,
    /// Maximum silence within a turn elapsed
    Response,
}

impl TimeoutKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeoutKind::Turn => "turn",
            TimeoutKind::Response => "response",
        }
    }
}

impl std::fmt::Display for TimeoutKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Timers to (re)start, relative to the moment the directive is applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClockArm {
    pub generation: u64,
    pub turn_in: Option<Duration>,
    pub response_in: Option<Duration>,
}

impl ClockArm {
    /// Neither timer is enabled.
    pub fn is_idle(&self) -> bool {
        self.turn_in.is_none() && self.response_in.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum ClockDirective {
    /// Leave pending timers alone
    #[default]
    Unchanged,
    /// Replace pending timers
    Arm(ClockArm),
    /// Cancel pending timers
    Disarm,
}

impl ClockDirective {
    /// Combine two directives issued by one operation: the later one wins
    /// unless it leaves the clock unchanged.
    pub fn then(self, next: ClockDirective) -> ClockDirective {
        match next {
            ClockDirective::Unchanged => self,
            other => other,
        }
    }

    pub fn generation(&self) -> Option<u64> {
        match self {
            ClockDirective::Arm(arm) => Some(arm.generation),
            _ => None,
        }
    }
}
