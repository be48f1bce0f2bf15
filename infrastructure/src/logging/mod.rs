//! Logging infrastructure: structured discussion event logging.
//!
//! Provides [`JsonlEventLog`], a JSONL file writer that implements the
//! [`EventSubscriber`](colloquy_application::EventSubscriber) port.

mod jsonl_event_log;

pub use jsonl_event_log::JsonlEventLog;
