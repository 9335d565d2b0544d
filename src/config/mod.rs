//! Configuration for the reelpipe orchestrator.
//!
//! Settings are layered in this order, later layers winning:
//! - built-in defaults
//! - the JSON file at `~/.reelpipe/config`
//! - `REELPIPE_*` environment variables
//!
//! The merged result is validated before use.

mod builder;
mod constants;
mod defaults;
mod environment;
mod loader;
mod types;
mod validation;

pub use constants::{
    DEFAULT_MAX_RETRIES, DEFAULT_READY_THRESHOLD, DEFAULT_RETRY_DELAY_MS,
    DEFAULT_TERMINAL_FIELD, DEFAULT_WARN_THRESHOLD,
};
pub use types::{BreakerSettings, CheckSettings, Config, PreflightSettings, StageSettings};

#[cfg(test)]
mod tests;
