//! CLI command definitions

use clap::{Parser, ValueEnum};
use colloquy_domain::{NewParticipant, ParticipantRole, TurnStrategyKind};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Output format for the final report
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Full report: roster, transcript and turn statistics
    Full,
    /// Status line and per-participant counts only
    Summary,
    /// The final orchestrator snapshot as JSON
    Json,
}

impl std::str::FromStr for OutputFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "full" => Ok(OutputFormat::Full),
            "summary" => Ok(OutputFormat::Summary),
            "json" => Ok(OutputFormat::Json),
            _ => Err(format!("Unknown output format: {}. Valid: full, summary, json", s)),
        }
    }
}

/// A participant given on the command line as `name[:role][:expertise,..]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParticipantSpec {
    pub name: String,
    pub role: ParticipantRole,
    pub expertise: Vec<String>,
}

impl ParticipantSpec {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            role: ParticipantRole::Participant,
            expertise: Vec::new(),
        }
    }

    pub fn to_new_participant(&self) -> NewParticipant {
        NewParticipant::new(self.name.as_str(), format!("agent-{}", self.name))
            .with_role(self.role)
            .with_expertise(self.expertise.iter().cloned())
    }
}

impl std::str::FromStr for ParticipantSpec {
    type Err = String;

    /// `alice`, `alice:moderator`, `alice:expert:rust,storage` or
    /// `alice::rust,storage` (role left at its default).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let mut parts = s.splitn(3, ':');
        let name = parts.next().unwrap_or_default().trim();
        if name.is_empty() {
            return Err(format!("Participant '{}' has no name", s));
        }
        let mut spec = ParticipantSpec::new(name);

        if let Some(role) = parts.next().map(str::trim)
            && !role.is_empty()
        {
            spec.role = role.parse()?;
        }
        if let Some(expertise) = parts.next() {
            spec.expertise = expertise
                .split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect();
        }
        Ok(spec)
    }
}

fn parse_strategy(s: &str) -> Result<TurnStrategyKind, String> {
    s.parse()
}

/// CLI arguments for colloquy
#[derive(Parser, Debug)]
#[command(name = "colloquy")]
#[command(author, version, about = "Discussion turn orchestrator - who speaks next, and when")]
#[command(long_about = r#"
Colloquy runs a multi-participant discussion and decides who holds the floor.

Participants take turns under one of six strategies: round_robin, moderated,
free_form, context_aware, priority_based and expertise_driven. This command
runs a scripted discussion: each participant speaks when given the floor,
silent participants pass, and the result is printed at the end.

Configuration files are loaded from (in priority order):
1. COLLOQUY_* environment variables
2. --config <path>     Explicit config file
3. ./colloquy.toml     Project-level config
4. ~/.config/colloquy/config.toml   Global config

Example:
  colloquy "Should we adopt a monorepo?"
  colloquy -p alice:moderator -p bob -p carol --strategy moderated "Release triage"
  colloquy -p ann::storage,latency -p ben::frontend --strategy expertise "Picking a database"
  colloquy --silent carol --rounds 4 "Quarterly planning"
"#)]
pub struct Cli {
    /// Topic of the discussion
    pub topic: Option<String>,

    /// Discussion title (defaults to the topic)
    #[arg(long)]
    pub title: Option<String>,

    /// Participant as name[:role][:expertise,..] (can be specified multiple times)
    #[arg(short, long = "participant", value_name = "SPEC")]
    pub participants: Vec<ParticipantSpec>,

    /// Turn strategy (defaults to the configured one)
    #[arg(short, long, value_parser = parse_strategy)]
    pub strategy: Option<TurnStrategyKind>,

    /// Rounds each participant gets before the discussion is wrapped up
    #[arg(short, long, default_value_t = 2)]
    pub rounds: usize,

    /// Participant who never speaks (can be specified multiple times)
    #[arg(long, value_name = "NAME")]
    pub silent: Vec<String>,

    /// Conclude once this many messages have been sent
    #[arg(long, value_name = "N")]
    pub max_messages: Option<u64>,

    /// Output format (defaults to the configured one, then full)
    #[arg(short, long, value_enum)]
    pub output: Option<OutputFormat>,

    /// Verbosity level (-v = info, -vv = debug, -vvv = trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Don't print events as they happen
    #[arg(short, long)]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,

    /// Path to configuration file
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Disable loading of configuration files
    #[arg(long)]
    pub no_config: bool,

    /// Show configuration file locations and exit
    #[arg(long)]
    pub show_config: bool,

    /// Append every discussion event to this JSONL file
    #[arg(long, value_name = "PATH")]
    pub event_log: Option<PathBuf>,

    /// Save snapshots to the configured snapshot directory
    #[arg(long)]
    pub persist: bool,
}

impl Cli {
    /// Participants to seat, falling back to a three-person demo roster.
    pub fn participant_specs(&self) -> Vec<ParticipantSpec> {
        if self.participants.is_empty() {
            ["alice", "bob", "carol"]
                .into_iter()
                .map(ParticipantSpec::new)
                .collect()
        } else {
            self.participants.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_participant_spec_forms() {
        let plain: ParticipantSpec = "alice".parse().unwrap();
        assert_eq!(plain, ParticipantSpec::new("alice"));

        let moderator: ParticipantSpec = "bob:moderator".parse().unwrap();
        assert_eq!(moderator.role, ParticipantRole::Moderator);
        assert!(moderator.expertise.is_empty());

        let expert: ParticipantSpec = "carol:expert:rust, storage".parse().unwrap();
        assert_eq!(expert.role, ParticipantRole::Expert);
        assert_eq!(expert.expertise, vec!["rust", "storage"]);

        let default_role: ParticipantSpec = "dan::latency".parse().unwrap();
        assert_eq!(default_role.role, ParticipantRole::Participant);
        assert_eq!(default_role.expertise, vec!["latency"]);
    }

    #[test]
    fn test_participant_spec_errors() {
        assert!(":moderator".parse::<ParticipantSpec>().is_err());
        assert!("eve:emperor".parse::<ParticipantSpec>().is_err());
    }

    #[test]
    fn test_parse_full_command_line() {
        let cli = Cli::try_parse_from([
            "colloquy",
            "-p",
            "alice:moderator",
            "-p",
            "bob",
            "--strategy",
            "moderated",
            "--silent",
            "bob",
            "--output",
            "json",
            "-vv",
            "Release triage",
        ])
        .unwrap();

        assert_eq!(cli.topic.as_deref(), Some("Release triage"));
        assert_eq!(cli.participants.len(), 2);
        assert_eq!(cli.strategy, Some(TurnStrategyKind::Moderated));
        assert_eq!(cli.silent, vec!["bob"]);
        assert_eq!(cli.output, Some(OutputFormat::Json));
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.rounds, 2);
    }

    #[test]
    fn test_default_roster() {
        let cli = Cli::try_parse_from(["colloquy", "Topic"]).unwrap();
        let names: Vec<_> = cli.participant_specs().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["alice", "bob", "carol"]);
    }

    #[test]
    fn test_unknown_strategy_is_rejected() {
        assert!(Cli::try_parse_from(["colloquy", "--strategy", "loudest", "Topic"]).is_err());
    }
}
