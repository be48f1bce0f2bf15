//! Output configuration from TOML (`[output]` section)

use serde::{Deserialize, Serialize};

/// Output formats the CLI understands
pub const OUTPUT_FORMATS: [&str; 3] = ["full", "summary", "json"];

/// Raw output configuration from TOML
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileOutputConfig {
    /// Output format: full, summary or json
    pub format: Option<String>,
    /// Enable colored terminal output
    pub color: bool,
}

impl Default for FileOutputConfig {
    fn default() -> Self {
        Self {
            format: None,
            color: true,
        }
    }
}
