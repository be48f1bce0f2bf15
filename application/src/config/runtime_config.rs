//! Runtime configuration for discussion workers.
//!
//! These are application-layer concerns: discussion settings and turn
//! strategies are domain policy and live on the discussion itself.

use serde::{Deserialize, Serialize};

/// Controls how [`DiscussionHub`](crate::use_cases::discussion_hub::DiscussionHub)
/// runs its workers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RuntimeConfig {
    /// Capacity of each worker's command channel.
    pub command_buffer: usize,
    /// Save a snapshot after every operation that emitted events.
    pub snapshot_on_commit: bool,
    /// Ask the scoring provider for fresh scores after each message.
    pub scoring_enabled: bool,
    /// How many recent messages the scoring provider sees.
    pub scoring_window: usize,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            command_buffer: 64,
            snapshot_on_commit: true,
            scoring_enabled: true,
            scoring_window: 20,
        }
    }
}

impl RuntimeConfig {
    // ==================== Builder Methods ====================

    pub fn with_command_buffer(mut self, size: usize) -> Self {
        self.command_buffer = size.max(1);
        self
    }

    pub fn with_snapshot_on_commit(mut self, enabled: bool) -> Self {
        self.snapshot_on_commit = enabled;
        self
    }

    pub fn with_scoring(mut self, enabled: bool) -> Self {
        self.scoring_enabled = enabled;
        self
    }

    pub fn with_scoring_window(mut self, messages: usize) -> Self {
        self.scoring_window = messages;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default() {
        let config = RuntimeConfig::default();
        assert_eq!(config.command_buffer, 64);
        assert!(config.snapshot_on_commit);
        assert!(config.scoring_enabled);
    }

    #[test]
    fn test_command_buffer_is_never_zero() {
        let config = RuntimeConfig::default().with_command_buffer(0);
        assert_eq!(config.command_buffer, 1);
    }
}
