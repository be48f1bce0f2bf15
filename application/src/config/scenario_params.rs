//! Scenario parameters for the scripted discussion runner.

use colloquy_domain::ParticipantId;
use serde::{Deserialize, Serialize};

/// Controls [`RunScenarioUseCase`](crate::use_cases::run_scenario::RunScenarioUseCase).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScenarioParams {
    /// Full rotations through the roster before the scenario wraps up.
    pub rounds: usize,
    /// Participants who never speak. Under strategies with a single holder
    /// they pass their turn.
    pub silent: Vec<ParticipantId>,
    /// Upper bound on operations, whatever the strategy does.
    pub max_steps: usize,
}

impl Default for ScenarioParams {
    fn default() -> Self {
        Self {
            rounds: 2,
            silent: Vec::new(),
            max_steps: 500,
        }
    }
}

impl ScenarioParams {
    pub fn with_rounds(mut self, rounds: usize) -> Self {
        self.rounds = rounds;
        self
    }

    pub fn with_silent(mut self, participant: impl Into<ParticipantId>) -> Self {
        self.silent.push(participant.into());
        self
    }

    pub fn with_max_steps(mut self, steps: usize) -> Self {
        self.max_steps = steps;
        self
    }

    pub fn is_silent(&self, participant: &ParticipantId) -> bool {
        self.silent.contains(participant)
    }
}
