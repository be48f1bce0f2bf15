//! Output formatting for discussion reports and live events

pub mod console;
pub mod events;
pub mod formatter;
