//! Raw TOML configuration data types
//!
//! These structs represent the exact structure of the TOML config file.
//! They are deserialized directly and use domain types where appropriate.

mod logging;
mod orchestrator;
mod output;
mod snapshots;
mod strategy;

pub use logging::FileLoggingConfig;
pub use orchestrator::FileOrchestratorConfig;
pub use output::{FileOutputConfig, OUTPUT_FORMATS};
pub use snapshots::FileSnapshotConfig;
pub use strategy::{FileModeratedConfig, FileStrategyConfig};

use super::validation::{ConfigIssue, ConfigIssueCode};
use colloquy_domain::DiscussionSettings;
use serde::{Deserialize, Serialize};

/// Complete file configuration (raw TOML structure)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileConfig {
    /// Discussion worker settings
    pub orchestrator: FileOrchestratorConfig,
    /// Default settings for new discussions
    pub settings: DiscussionSettings,
    /// Default turn strategy and per-strategy tuning
    pub strategy: FileStrategyConfig,
    /// Output settings
    pub output: FileOutputConfig,
    /// Event log and diagnostic log locations
    pub logging: FileLoggingConfig,
    /// Snapshot persistence
    pub snapshots: FileSnapshotConfig,
}

impl FileConfig {
    /// Validate the entire configuration, returning all detected issues.
    pub fn validate(&self) -> Vec<ConfigIssue> {
        let mut issues = Vec::new();

        // 1. Discussion settings
        if let Err(message) = self.settings.validate() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::InvalidValue {
                    field: "settings".to_string(),
                },
                format!("settings: {}", message),
            ));
        }

        // 2. Strategy kind and tuning
        issues.extend(self.strategy.issues());

        // 3. Output format
        if let Some(format) = &self.output.format
            && !OUTPUT_FORMATS.contains(&format.to_lowercase().as_str())
        {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidEnumValue {
                    field: "output.format".to_string(),
                    value: format.clone(),
                    valid_values: OUTPUT_FORMATS.iter().map(|f| f.to_string()).collect(),
                },
                format!("output.format: unknown value '{}', falling back to 'full'", format),
            ));
        }

        // 4. Runtime
        if self.orchestrator.command_buffer == 0 {
            issues.push(ConfigIssue::warning(
                ConfigIssueCode::InvalidValue {
                    field: "orchestrator.command_buffer".to_string(),
                },
                "orchestrator.command_buffer: must be at least 1, using 1",
            ));
        }

        // 5. Snapshots need somewhere to go
        if self.snapshots.enabled && self.snapshots.resolved_dir().is_none() {
            issues.push(ConfigIssue::error(
                ConfigIssueCode::MissingValue {
                    field: "snapshots.dir".to_string(),
                },
                "snapshots.dir: no data directory on this platform, set one explicitly",
            ));
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_full_config() {
        let toml_str = r#"
[orchestrator]
command_buffer = 16

[settings]
max_participants = 5
turn_timeout_secs = 120
response_timeout_secs = 0
max_messages = 40

[strategy]
kind = "free_form"

[strategy.free_form]
cooldown_period_secs = 2

[output]
format = "summary"

[logging]
event_log = "events.jsonl"

[snapshots]
enabled = true
dir = "/tmp/colloquy"
"#;

        let config: FileConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.orchestrator.command_buffer, 16);
        assert_eq!(config.settings.max_participants, 5);
        assert_eq!(config.settings.turn_timeout_secs, 120);
        assert_eq!(config.settings.max_messages, Some(40));
        // Unset fields keep their defaults
        assert_eq!(config.settings.max_message_length, 10_000);
        assert_eq!(config.strategy.free_form.cooldown_period_secs, 2);
        assert_eq!(config.output.format.as_deref(), Some("summary"));
        assert!(config.snapshots.enabled);
        assert!(config.validate().is_empty());
    }

    #[test]
    fn test_default_config_is_valid() {
        assert!(FileConfig::default().validate().is_empty());
    }

    #[test]
    fn test_invalid_settings_is_an_error() {
        let toml_str = r#"
[settings]
max_participants = 1
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(issues[0].is_error());
    }

    #[test]
    fn test_unknown_output_format_is_a_warning() {
        let toml_str = r#"
[output]
format = "yaml"
"#;
        let config: FileConfig = toml::from_str(toml_str).unwrap();
        let issues = config.validate();
        assert_eq!(issues.len(), 1);
        assert!(!issues[0].is_error());
    }
}
