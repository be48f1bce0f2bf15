//! Console output formatter for discussion reports

use crate::cli::commands::OutputFormat;
use crate::output::formatter::OutputFormatter;
use colored::Colorize;
use colloquy_domain::util::preview;
use colloquy_domain::{DiscussionParticipant, DiscussionStatus, OrchestratorSnapshot};

const TRANSCRIPT_PREVIEW: usize = 100;

/// Formats discussion reports for console display
pub struct ConsoleFormatter;

impl ConsoleFormatter {
    /// Render `snapshot` in the requested format.
    pub fn render(snapshot: &OrchestratorSnapshot, format: OutputFormat) -> String {
        match format {
            OutputFormat::Full => ConsoleFormatter.format(snapshot),
            OutputFormat::Summary => ConsoleFormatter.format_summary(snapshot),
            OutputFormat::Json => ConsoleFormatter.format_json(snapshot),
        }
    }

    fn header(title: &str) -> String {
        let line = "=".repeat(60);
        format!("{}\n{:^60}\n{}", line.cyan(), title.bold(), line.cyan())
    }

    fn section_header(title: &str) -> String {
        format!("\n{}\n{}\n", title.cyan().bold(), "-".repeat(40))
    }

    fn footer() -> String {
        format!("\n{}\n", "=".repeat(60).cyan())
    }

    pub fn status_label(status: DiscussionStatus) -> String {
        let label = status.as_str();
        match status {
            DiscussionStatus::Active => label.green().bold().to_string(),
            DiscussionStatus::Paused => label.yellow().bold().to_string(),
            DiscussionStatus::Completed => label.cyan().bold().to_string(),
            DiscussionStatus::Cancelled => label.red().bold().to_string(),
            DiscussionStatus::Draft | DiscussionStatus::Archived => label.dimmed().to_string(),
        }
    }

    fn participant_line(snapshot: &OrchestratorSnapshot, p: &DiscussionParticipant) -> String {
        let mut line = format!(
            "  {:<12} {:<12} {:>3} msg",
            p.id.as_str(),
            p.role.as_str(),
            p.message_count
        );
        let skips = snapshot.strategy_state.round_robin.skips(&p.id);
        if skips > 0 {
            line.push_str(&format!("  {} skipped", skips));
        }
        if !p.expertise.is_empty() {
            line.push_str(&format!("  [{}]", p.expertise.join(", ")));
        }
        if p.is_active {
            line
        } else {
            format!("{} {}", line.dimmed(), "(inactive)".red())
        }
    }

    /// Indent a multi-line string
    pub fn indent(text: &str, prefix: &str) -> String {
        text.lines()
            .map(|line| format!("{}{}", prefix, line))
            .collect::<Vec<_>>()
            .join("\n")
    }
}

impl OutputFormatter for ConsoleFormatter {
    fn format(&self, snapshot: &OrchestratorSnapshot) -> String {
        let d = &snapshot.discussion;
        let mut output = String::new();

        output.push_str(&Self::header(&d.title));
        output.push('\n');
        output.push_str(&format!("{} {}\n", "Topic:".cyan().bold(), d.topic));
        output.push_str(&format!(
            "{} {}\n",
            "Strategy:".cyan().bold(),
            d.turn_strategy.kind()
        ));
        output.push_str(&format!(
            "{} {} ({})\n",
            "Status:".cyan().bold(),
            Self::status_label(d.status),
            d.state.phase.display_name()
        ));

        output.push_str(&Self::section_header("Participants"));
        for p in d.participants.join_order() {
            output.push_str(&Self::participant_line(snapshot, p));
            output.push('\n');
        }

        output.push_str(&Self::section_header("Transcript"));
        if snapshot.messages.is_empty() {
            output.push_str(&format!("  {}\n", "(no messages)".dimmed()));
        }
        for message in snapshot.messages.iter() {
            let speaker = format!("[{}] {}", message.turn_number, message.participant_id);
            if message.is_deleted {
                output.push_str(&format!("{} {}\n", speaker.dimmed(), "(deleted)".dimmed()));
                continue;
            }
            let edited = if message.is_edited { " (edited)" } else { "" };
            output.push_str(&format!(
                "{}{}\n{}\n",
                speaker.yellow().bold(),
                edited.dimmed(),
                Self::indent(&preview(&message.content, TRANSCRIPT_PREVIEW), "    ")
            ));
        }

        let state = &d.state;
        let has_analysis = state.consensus_level > 0.0
            || state.engagement_score > 0.0
            || !state.key_points.is_empty()
            || !state.decisions.is_empty()
            || !state.action_items.is_empty();
        if has_analysis {
            output.push_str(&Self::section_header("Analysis"));
            output.push_str(&format!(
                "  Consensus:  {:.0}%\n  Engagement: {:.0}%\n",
                state.consensus_level * 100.0,
                state.engagement_score
            ));
            for point in &state.key_points {
                output.push_str(&format!("  * {}\n", point.point));
            }
            for decision in &state.decisions {
                output.push_str(&format!("  {} {}\n", "Decided:".green(), decision.decision));
            }
            for item in &state.action_items {
                output.push_str(&format!("  {} {}\n", "Action:".yellow(), item.item));
            }
        }

        output.push_str(&format!(
            "\n{} {} turns, {} messages\n",
            "Totals:".cyan().bold(),
            state.current_turn.turn_number,
            snapshot.messages.len()
        ));
        output.push_str(&Self::footer());
        output
    }

    fn format_json(&self, snapshot: &OrchestratorSnapshot) -> String {
        snapshot.to_json().unwrap_or_else(|_| "{}".to_string())
    }

    fn format_summary(&self, snapshot: &OrchestratorSnapshot) -> String {
        let d = &snapshot.discussion;
        let mut output = format!(
            "{} {} after {} turns, {} messages ({})\n",
            "=== Discussion".cyan().bold(),
            Self::status_label(d.status),
            d.state.current_turn.turn_number,
            snapshot.messages.len(),
            d.turn_strategy.kind()
        );
        for p in d.participants.join_order() {
            let marker = if p.is_active { "" } else { " (inactive)" };
            output.push_str(&format!("  {}: {}{}\n", p.id, p.message_count, marker));
        }
        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use colloquy_domain::{
        DiscussionOrchestrator, MessageDraft, NewDiscussion, NewParticipant, ParticipantId,
    };

    fn snapshot() -> OrchestratorSnapshot {
        colored::control::set_override(false);
        let request = NewDiscussion::new("Design review", "Queue or log?")
            .with_participant(NewParticipant::new("alice", "agent-a"))
            .with_participant(NewParticipant::new("bob", "agent-b"));
        let mut orchestrator = DiscussionOrchestrator::create(request, Utc::now()).unwrap();
        let now = Utc::now();
        orchestrator.start(now).unwrap();
        orchestrator
            .submit_message(
                &ParticipantId::new("alice"),
                MessageDraft::new("A log.\nIt replays."),
                now,
            )
            .unwrap();
        orchestrator.snapshot()
    }

    #[test]
    fn test_full_report() {
        let report = ConsoleFormatter::render(&snapshot(), OutputFormat::Full);
        assert!(report.contains("Design review"));
        assert!(report.contains("Queue or log?"));
        assert!(report.contains("Round Robin"));
        assert!(report.contains("A log. It replays."));
        assert!(report.contains("alice"));
    }

    #[test]
    fn test_summary() {
        let summary = ConsoleFormatter::render(&snapshot(), OutputFormat::Summary);
        assert!(summary.contains("active"));
        assert!(summary.contains("alice: 1"));
        assert!(summary.contains("bob: 0"));
    }

    #[test]
    fn test_json_round_trips() {
        let snapshot = snapshot();
        let json = ConsoleFormatter::render(&snapshot, OutputFormat::Json);
        assert_eq!(OrchestratorSnapshot::from_json(&json).unwrap(), snapshot);
    }

    #[test]
    fn test_indent() {
        assert_eq!(ConsoleFormatter::indent("a\nb", "> "), "> a\n> b");
    }
}
