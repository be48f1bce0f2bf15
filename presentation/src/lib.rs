//! Presentation layer for colloquy
//!
//! This crate contains the CLI definition, the report formatters and the
//! console event printer.

pub mod cli;
pub mod output;

// Re-export commonly used types
pub use cli::commands::{Cli, OutputFormat, ParticipantSpec};
pub use output::console::ConsoleFormatter;
pub use output::events::ConsoleEventPrinter;
pub use output::formatter::OutputFormatter;
