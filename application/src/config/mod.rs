//! Application-level configuration.
//!
//! - [`RuntimeConfig`]: how discussion workers run (channel sizes,
//!   persistence and scoring hooks)
//! - [`ScenarioParams`]: how the scripted scenario runner drives a discussion

pub mod runtime_config;
pub mod scenario_params;

pub use runtime_config::RuntimeConfig;
pub use scenario_params::ScenarioParams;
