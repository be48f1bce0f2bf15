//! Output formatter trait

use colloquy_domain::OrchestratorSnapshot;

/// Trait for formatting the final state of a discussion
pub trait OutputFormatter {
    /// Format the complete report
    fn format(&self, snapshot: &OrchestratorSnapshot) -> String;

    /// Format as JSON
    fn format_json(&self, snapshot: &OrchestratorSnapshot) -> String;

    /// Format a short summary
    fn format_summary(&self, snapshot: &OrchestratorSnapshot) -> String;
}
