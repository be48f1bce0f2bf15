//! Persisted orchestrator state
//!
//! A snapshot holds everything selection depends on, so a restored
//! orchestrator picks exactly the speakers the original would have picked.
//! Pending timers are not part of it: after a restore the runtime re-arms the
//! clock from the restore time.

use crate::discussion::entities::Discussion;
use crate::message::log::MessageLog;
use crate::turn::scoring::ScoringInputs;
use crate::turn::state::StrategyState;
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorSnapshot {
    pub version: u32,
    pub discussion: Discussion,
    pub strategy_state: StrategyState,
    pub messages: MessageLog,
    pub scores: ScoringInputs,
    /// Sequence number the next event will carry
    pub next_sequence: u64,
    pub timer_generation: u64,
}

impl OrchestratorSnapshot {
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}
