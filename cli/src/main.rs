//! CLI entrypoint for colloquy
//!
//! This is the main binary that wires together all layers using
//! dependency injection.

use anyhow::{Context, Result, bail};
use clap::Parser;
use colloquy_application::{
    DiscussionHub, EventSubscriber, RunScenarioInput, RunScenarioUseCase, ScenarioParams,
    SnapshotStore,
};
use colloquy_domain::{NewDiscussion, ParticipantId, ParticipantRole, TurnStrategyConfig};
use colloquy_infrastructure::{
    ConfigLoader, FileConfig, JsonFileSnapshotStore, JsonlEventLog, KeywordScorer,
};
use colloquy_presentation::{Cli, ConsoleEventPrinter, ConsoleFormatter, OutputFormat, ParticipantSpec};
use std::sync::Arc;
use tracing::{info, warn};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.show_config {
        ConfigLoader::print_config_sources(cli.config.as_ref());
        return Ok(());
    }

    let config = if cli.no_config {
        ConfigLoader::load_defaults()
    } else {
        ConfigLoader::load(cli.config.as_ref()).context("Failed to load configuration")?
    };

    // Keep the guard alive so buffered log lines are flushed on exit
    let _log_guard = init_logging(cli.verbose, &config);

    info!("Starting colloquy");

    let issues = config.validate();
    for issue in issues.iter().filter(|i| !i.is_error()) {
        eprintln!("warning: {}", issue.message);
    }
    if issues.iter().any(|i| i.is_error()) {
        for issue in issues.iter().filter(|i| i.is_error()) {
            eprintln!("error: {}", issue.message);
        }
        bail!("Invalid configuration");
    }

    if cli.no_color || !config.output.color {
        colored::control::set_override(false);
    }

    let topic = match &cli.topic {
        Some(topic) => topic.clone(),
        None => bail!("A topic is required. Run with --help for usage."),
    };

    let specs = cli.participant_specs();
    let strategy = build_strategy(&cli, &config, &specs)?;
    let output_format = resolve_output_format(&cli, &config);

    let mut settings = config.settings.clone();
    if let Some(max) = cli.max_messages {
        settings.max_messages = Some(max);
    }

    let mut discussion = NewDiscussion::new(cli.title.clone().unwrap_or_else(|| topic.clone()), topic)
        .with_settings(settings)
        .with_strategy(strategy)
        .created_by("colloquy-cli");
    for spec in &specs {
        discussion = discussion.with_participant(spec.to_new_participant());
    }

    let mut params = ScenarioParams::default().with_rounds(cli.rounds);
    for name in &cli.silent {
        params = params.with_silent(name.as_str());
    }

    // === Dependency Injection ===
    let mut hub = DiscussionHub::new(config.orchestrator.to_runtime_config())
        .with_scorer(Arc::new(KeywordScorer::new()));

    if cli.persist || config.snapshots.enabled {
        match config.snapshots.resolved_dir() {
            Some(dir) => {
                info!(dir = %dir.display(), "Persisting snapshots");
                let store: Arc<dyn SnapshotStore> = Arc::new(JsonFileSnapshotStore::new(dir));
                hub = hub.with_snapshot_store(store);
            }
            None => warn!("No snapshot directory available, snapshots disabled"),
        }
    }

    let event_log_path = cli.event_log.clone().or_else(|| config.logging.event_log.clone());
    if let Some(path) = event_log_path {
        match JsonlEventLog::new(&path) {
            Some(log) => hub.subscribe(Arc::new(log) as Arc<dyn EventSubscriber>),
            None => warn!(path = %path.display(), "Could not open event log"),
        }
    }

    if !cli.quiet {
        hub.subscribe(Arc::new(ConsoleEventPrinter::new()) as Arc<dyn EventSubscriber>);
        print_header(&cli, &specs, &discussion);
    }

    let hub = Arc::new(hub);
    let use_case = RunScenarioUseCase::new(Arc::clone(&hub));
    let result = use_case
        .execute(RunScenarioInput::new(discussion).with_params(params))
        .await;

    // Flush subscribers before printing the report, even on failure
    hub.shutdown().await;
    let result = result?;

    info!(
        steps = result.steps,
        messages = result.messages_sent,
        passes = result.passes,
        rejected = result.rejected,
        "Scenario finished"
    );

    if !cli.quiet {
        println!();
    }
    println!("{}", ConsoleFormatter::render(&result.snapshot, output_format));

    Ok(())
}

/// Stderr logging by verbosity, plus a daily log file when `logging.log_dir` is set.
fn init_logging(verbose: u8, config: &FileConfig) -> Option<WorkerGuard> {
    let filter = match verbose {
        0 => EnvFilter::new("warn"),
        1 => EnvFilter::new("info"),
        2 => EnvFilter::new("debug"),
        _ => EnvFilter::new("trace"), // -vvv or more
    };

    let (file_layer, guard) = match &config.logging.log_dir {
        Some(dir) => {
            let appender = tracing_appender::rolling::daily(dir, "colloquy.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false),
        )
        .with(file_layer)
        .init();

    guard
}

/// Strategy from `--strategy`, else the configured kind.
///
/// A moderated discussion without a configured moderator falls back to the
/// first participant seated as moderator.
fn build_strategy(
    cli: &Cli,
    config: &FileConfig,
    specs: &[ParticipantSpec],
) -> Result<TurnStrategyConfig> {
    let kind = match cli.strategy {
        Some(kind) => kind,
        None => config.strategy.parse_kind().0,
    };
    let fallback = specs
        .iter()
        .find(|s| s.role == ParticipantRole::Moderator)
        .map(|s| ParticipantId::new(s.name.as_str()));
    config
        .strategy
        .build(kind, fallback.as_ref())
        .with_context(|| format!("Cannot use the {} strategy", kind))
}

fn resolve_output_format(cli: &Cli, config: &FileConfig) -> OutputFormat {
    if let Some(format) = cli.output {
        return format;
    }
    config
        .output
        .format
        .as_deref()
        .and_then(|f| f.parse().ok())
        .unwrap_or(OutputFormat::Full)
}

fn print_header(cli: &Cli, specs: &[ParticipantSpec], discussion: &NewDiscussion) {
    let strategy = discussion
        .turn_strategy
        .as_ref()
        .map(|s| s.kind().display_name())
        .unwrap_or("Round Robin");
    println!();
    println!("+============================================================+");
    println!("|           Colloquy - Discussion Turn Orchestrator          |");
    println!("+============================================================+");
    println!();
    println!("Topic: {}", discussion.topic);
    println!(
        "Participants: {}",
        specs
            .iter()
            .map(|s| s.name.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!("Strategy: {} ({} rounds)", strategy, cli.rounds);
    println!();
}
