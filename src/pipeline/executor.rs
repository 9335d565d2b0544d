use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::errors::{ErrorKind, StageError};

use super::breaker::CircuitBreaker;
use super::outcome::StageOutcome;
use super::record::{Artifacts, WorkRecord};
use super::stages::StageSpec;

/// Runs one stage with input validation, bounded retry, and output validation.
#[derive(Debug, Clone, Default)]
pub struct StageExecutor {
    breaker: Option<Arc<CircuitBreaker>>,
}

impl StageExecutor {
    pub fn new() -> Self {
        Self { breaker: None }
    }

    pub fn with_breaker(mut self, breaker: Option<Arc<CircuitBreaker>>) -> Self {
        self.breaker = breaker;
        self
    }

    pub async fn execute(&self, spec: &StageSpec, record: &WorkRecord) -> StageOutcome {
        let started = Instant::now();
        let name = spec.name();

        if let Err(error) = spec.stage().validate_input(record) {
            warn!(stage = name, record = %record.id, error = %error.message, "input rejected");
            let error = StageError::new(ErrorKind::InvalidInput, error.message);
            return StageOutcome::failed(error, 0, started.elapsed());
        }

        if let Some(breaker) = &self.breaker {
            if !breaker.allow(name) {
                warn!(stage = name, "circuit open, not attempting stage");
                let error = StageError::transient(format!("circuit open for stage {name}"));
                return StageOutcome::failed(error, 0, started.elapsed());
            }
        }

        let outcome = self.run_with_retries(spec, record, started).await;
        self.report_to_breaker(name, outcome.success);
        outcome
    }

    async fn run_with_retries(
        &self,
        spec: &StageSpec,
        record: &WorkRecord,
        started: Instant,
    ) -> StageOutcome {
        let name = spec.name();
        let mut failures: u32 = 0;
        loop {
            let attempt = failures + 1;
            debug!(stage = name, attempt, "attempting stage");
            let attempt_started = Instant::now();
            let result = self.attempt(spec, record).await;
            spec.metrics()
                .record_attempt(result.is_ok(), attempt_started.elapsed());

            let error = match result {
                Ok(value) => {
                    info!(
                        stage = name,
                        attempt,
                        fields = value.len(),
                        "stage succeeded"
                    );
                    return StageOutcome::succeeded(value, failures, started.elapsed());
                }
                Err(error) => error,
            };

            if !error.is_retriable() {
                warn!(stage = name, attempt, kind = %error.kind, error = %error.message, "stage failed, not retriable");
                return StageOutcome::failed(error, failures, started.elapsed());
            }
            if failures >= spec.max_retries {
                warn!(stage = name, attempt, error = %error.message, "retry budget exhausted");
                return StageOutcome::failed(error, spec.max_retries, started.elapsed());
            }

            failures += 1;
            let delay = backoff_delay(spec.retry_base_delay, failures);
            warn!(
                stage = name,
                attempt,
                delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                error = %error.message,
                "stage failed, retrying"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn attempt(&self, spec: &StageSpec, record: &WorkRecord) -> Result<Artifacts, StageError> {
        let stage = spec.stage();
        let value = match spec.timeout {
            Some(limit) => match tokio::time::timeout(limit, stage.run(record)).await {
                Ok(result) => result?,
                Err(_) => {
                    return Err(StageError::transient(format!(
                        "timed out after {}ms",
                        limit.as_millis()
                    )));
                }
            },
            None => stage.run(record).await?,
        };

        stage
            .validate_output(&value)
            .map_err(|error| StageError::new(ErrorKind::TransientUpstream, error.message))?;
        Ok(value)
    }

    fn report_to_breaker(&self, stage: &str, success: bool) {
        if let Some(breaker) = &self.breaker {
            if success {
                breaker.record_success(stage);
            } else {
                breaker.record_failure(stage);
            }
        }
    }
}

/// Linear backoff: `base × failures`, saturating instead of overflowing.
fn backoff_delay(base: Duration, failures: u32) -> Duration {
    base.checked_mul(failures).unwrap_or(Duration::MAX)
}
