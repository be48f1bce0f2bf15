//! Snapshot configuration from TOML (`[snapshots]` section)

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Raw snapshot configuration from TOML
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct FileSnapshotConfig {
    /// Persist discussions to disk
    pub enabled: bool,
    /// Where snapshots go; defaults to the platform data directory
    pub dir: Option<PathBuf>,
}

impl FileSnapshotConfig {
    /// Configured directory, or `$XDG_DATA_HOME/colloquy/snapshots`.
    pub fn resolved_dir(&self) -> Option<PathBuf> {
        self.dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("colloquy").join("snapshots")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_explicit_dir_wins() {
        let config = FileSnapshotConfig {
            enabled: true,
            dir: Some(PathBuf::from("/tmp/colloquy-snapshots")),
        };
        assert_eq!(
            config.resolved_dir(),
            Some(PathBuf::from("/tmp/colloquy-snapshots"))
        );
    }
}
