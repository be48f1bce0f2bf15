//! Infrastructure layer for colloquy
//!
//! This crate contains adapters that implement the ports defined in the
//! application layer: configuration file loading, the JSONL event log, the
//! JSON snapshot store and the keyword scorer.

pub mod config;
pub mod logging;
pub mod scoring;
pub mod storage;

// Re-export commonly used types
pub use config::{
    ConfigIssue, ConfigIssueCode, ConfigLoader, ConfigValidationError, FileConfig,
    FileLoggingConfig, FileOrchestratorConfig, FileOutputConfig, FileSnapshotConfig,
    FileStrategyConfig, Severity,
};
pub use logging::JsonlEventLog;
pub use scoring::KeywordScorer;
pub use storage::JsonFileSnapshotStore;
