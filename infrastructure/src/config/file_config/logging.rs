//! Logging configuration from TOML (`[logging]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw logging configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileLoggingConfig {
    /// Record every discussion event to this JSONL file
    pub event_log: Option<PathBuf>,
    /// Directory for daily rolling diagnostic logs
    pub log_dir: Option<PathBuf>,
}
