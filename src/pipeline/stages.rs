use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::config::{DEFAULT_MAX_RETRIES, DEFAULT_RETRY_DELAY_MS};
use crate::errors::StageError;
use crate::recovery::CompletionPredicate;
use crate::recovery::predicates;

use super::metrics::StageMetrics;
use super::record::{Artifacts, WorkRecord};
use super::types::StageKind;

/// One unit of work in the pipeline.
///
/// `run` must not mutate anything the orchestrator owns: it reads the record
/// and returns the artifacts to merge.
#[async_trait]
pub trait Stage: Send + Sync {
    fn kind(&self) -> StageKind;

    fn name(&self) -> String {
        self.kind().to_string()
    }

    fn validate_input(&self, _record: &WorkRecord) -> Result<(), StageError> {
        Ok(())
    }

    async fn run(&self, record: &WorkRecord) -> Result<Artifacts, StageError>;

    fn validate_output(&self, output: &Artifacts) -> Result<(), StageError> {
        let is_complete = self.completion();
        if is_complete(output) {
            Ok(())
        } else {
            Err(StageError::invalid_output(format!(
                "{} output does not contain its required artifacts",
                self.name()
            )))
        }
    }

    /// Pure check over a record's fields telling whether this stage already ran.
    fn completion(&self) -> CompletionPredicate {
        predicates::for_kind(self.kind())
    }
}

/// Static configuration of one stage plus its process-lifetime counters.
pub struct StageSpec {
    name: String,
    stage: Arc<dyn Stage>,
    pub max_retries: u32,
    pub retry_base_delay: Duration,
    pub timeout: Option<Duration>,
    metrics: StageMetrics,
}

impl StageSpec {
    pub fn new<S>(stage: S) -> Self
    where
        S: Stage + 'static,
    {
        Self::from_arc(Arc::new(stage))
    }

    pub fn from_arc(stage: Arc<dyn Stage>) -> Self {
        Self {
            name: stage.name(),
            stage,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_base_delay: Duration::from_millis(DEFAULT_RETRY_DELAY_MS),
            timeout: None,
            metrics: StageMetrics::default(),
        }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> StageKind {
        self.stage.kind()
    }

    pub fn stage(&self) -> &dyn Stage {
        self.stage.as_ref()
    }

    pub fn completion(&self) -> CompletionPredicate {
        self.stage.completion()
    }

    pub fn metrics(&self) -> &StageMetrics {
        &self.metrics
    }
}

impl std::fmt::Debug for StageSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StageSpec")
            .field("name", &self.name)
            .field("max_retries", &self.max_retries)
            .field("retry_base_delay", &self.retry_base_delay)
            .field("timeout", &self.timeout)
            .finish()
    }
}
