//! Per-stage circuit breaker.
//!
//! The executor consults it once per stage execution, before any attempt,
//! and reports only the stage's final outcome.
//!
//! Closed: stages proceed. Open: stages are refused until the cooldown
//! elapses. HalfOpen: one stage execution is let through; success closes the
//! circuit, failure reopens it.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tokio::time::Instant;
use tracing::{info, warn};

use crate::config::BreakerSettings;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CircuitState {
    Closed,
    Open { since: Instant },
    HalfOpen,
}

#[derive(Debug, Clone, Copy)]
struct StageCircuit {
    state: CircuitState,
    consecutive_failures: u32,
}

impl Default for StageCircuit {
    fn default() -> Self {
        Self {
            state: CircuitState::Closed,
            consecutive_failures: 0,
        }
    }
}

#[derive(Debug)]
pub struct CircuitBreaker {
    failure_threshold: u32,
    cooldown: Duration,
    circuits: Mutex<HashMap<String, StageCircuit>>,
}

impl CircuitBreaker {
    /// A `failure_threshold` of zero disables the breaker.
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            failure_threshold,
            cooldown,
            circuits: Mutex::new(HashMap::new()),
        }
    }

    pub fn from_settings(settings: &BreakerSettings) -> Self {
        Self::new(
            settings.failure_threshold,
            Duration::from_secs(settings.cooldown_secs),
        )
    }

    /// Whether `stage` may execute right now.
    pub fn allow(&self, stage: &str) -> bool {
        if self.failure_threshold == 0 {
            return true;
        }
        let mut circuits = self.lock();
        let circuit = circuits.entry(stage.to_string()).or_default();
        match circuit.state {
            CircuitState::Closed | CircuitState::HalfOpen => true,
            CircuitState::Open { since } => {
                if since.elapsed() >= self.cooldown {
                    info!(stage, "circuit half-open, allowing one trial execution");
                    circuit.state = CircuitState::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    pub fn record_success(&self, stage: &str) {
        if self.failure_threshold == 0 {
            return;
        }
        let mut circuits = self.lock();
        let circuit = circuits.entry(stage.to_string()).or_default();
        if circuit.state != CircuitState::Closed {
            info!(stage, "circuit closed");
        }
        *circuit = StageCircuit::default();
    }

    pub fn record_failure(&self, stage: &str) {
        if self.failure_threshold == 0 {
            return;
        }
        let mut circuits = self.lock();
        let circuit = circuits.entry(stage.to_string()).or_default();
        circuit.consecutive_failures = circuit.consecutive_failures.saturating_add(1);
        let trip = match circuit.state {
            CircuitState::HalfOpen => true,
            CircuitState::Closed => circuit.consecutive_failures >= self.failure_threshold,
            CircuitState::Open { .. } => false,
        };
        if trip {
            warn!(
                stage,
                failures = circuit.consecutive_failures,
                "circuit opened"
            );
            circuit.state = CircuitState::Open {
                since: Instant::now(),
            };
        }
    }

    #[cfg(test)]
    pub fn state(&self, stage: &str) -> CircuitState {
        self.lock()
            .get(stage)
            .map(|circuit| circuit.state)
            .unwrap_or(CircuitState::Closed)
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, StageCircuit>> {
        self.circuits
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
