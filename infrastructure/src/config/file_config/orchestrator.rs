//! Runtime configuration from TOML (`[orchestrator]` section)

use colloquy_application::RuntimeConfig;
use serde::{Deserialize, Serialize};

/// Raw runtime configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOrchestratorConfig {
    /// Capacity of each discussion worker's command channel
    pub command_buffer: usize,
    /// Save a snapshot after every operation that emitted events
    pub snapshot_on_commit: bool,
    /// Rescore participants after each message
    pub scoring: bool,
    /// Recent messages the scorer looks at
    pub scoring_window: usize,
}

impl Default for FileOrchestratorConfig {
    fn default() -> Self {
        let runtime = RuntimeConfig::default();
        Self {
            command_buffer: runtime.command_buffer,
            snapshot_on_commit: runtime.snapshot_on_commit,
            scoring: runtime.scoring_enabled,
            scoring_window: runtime.scoring_window,
        }
    }
}

impl FileOrchestratorConfig {
    pub fn to_runtime_config(&self) -> RuntimeConfig {
        RuntimeConfig::default()
            .with_command_buffer(self.command_buffer)
            .with_snapshot_on_commit(self.snapshot_on_commit)
            .with_scoring(self.scoring)
            .with_scoring_window(self.scoring_window)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_orchestrator_section() {
        let toml_str = r#"
[orchestrator]
command_buffer = 8
scoring = false
"#;
        let config: super::super::FileConfig = toml::from_str(toml_str).unwrap();
        let runtime = config.orchestrator.to_runtime_config();
        assert_eq!(runtime.command_buffer, 8);
        assert!(!runtime.scoring_enabled);
        assert!(runtime.snapshot_on_commit);
    }
}
