//! Health gating before a pipeline run.
//!
//! Every configured [`gate::HealthCheck`] is probed concurrently with its own
//! deadline; the [`PreflightGate`] folds the scores into a [`PreflightReport`]
//! that says whether the run may proceed.

pub mod checks;
pub mod gate;
pub mod types;

pub use gate::PreflightGate;
pub use types::{CheckStatus, OverallStatus, PreflightReport};

#[cfg(test)]
mod tests;
