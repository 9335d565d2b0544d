use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::client::ServiceClient;
use crate::config::Config;
use crate::errors::{PipelineError, StageError};
use crate::recovery::RecoveryPlan;

use super::adapters::{HttpStage, ParallelStage};
use super::context::{PipelineContext, RunContext};
use super::executor::StageExecutor;
use super::outcome::{PipelineRun, RunState};
use super::record::{RunStatus, WorkRecord};
use super::stages::{Stage, StageSpec};
use super::types::StageKind;

/// Drives an ordered list of stages over one work record.
pub struct PipelineRunner {
    stages: Vec<StageSpec>,
    context: PipelineContext,
    executor: StageExecutor,
}

impl PipelineRunner {
    pub fn new(stages: Vec<StageSpec>, context: PipelineContext) -> Self {
        let executor = StageExecutor::new().with_breaker(context.breaker());
        Self {
            stages,
            context,
            executor,
        }
    }

    pub fn builder() -> PipelineBuilder {
        PipelineBuilder::new()
    }

    #[cfg(test)]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    pub fn stages(&self) -> &[StageSpec] {
        &self.stages
    }

    pub fn index_of(&self, kind: StageKind) -> Option<usize> {
        self.stages.iter().position(|spec| spec.kind() == kind)
    }

    pub fn plan(&self, record: &WorkRecord) -> RecoveryPlan {
        self.context.planner().plan(record, &self.stages)
    }

    /// Consult the recovery planner, then run from the stage it picks.
    pub async fn run(&self, record: WorkRecord) -> Result<PipelineRun, PipelineError> {
        match self.plan(&record) {
            RecoveryPlan::NotRecoverable { reason } => {
                info!(record = %record.id, %reason, "nothing to resume");
                Ok(RunContext::new(record, self.stages.len())
                    .into_run(RunState::NotRecoverable { reason }))
            }
            RecoveryPlan::Resume(point) => {
                info!(
                    record = %record.id,
                    stage_index = point.stage_index,
                    reason = %point.reason,
                    "resuming pipeline"
                );
                let mut run = RunContext::new(record, point.stage_index);
                run.record_resume(point.stage_index, point.reason);
                self.drive(run, point.stage_index).await
            }
        }
    }

    /// Run every stage from `start_index` to the end.
    pub async fn run_from(
        &self,
        record: WorkRecord,
        start_index: usize,
    ) -> Result<PipelineRun, PipelineError> {
        self.drive(RunContext::new(record, start_index), start_index)
            .await
    }

    async fn drive(
        &self,
        mut run: RunContext,
        start_index: usize,
    ) -> Result<PipelineRun, PipelineError> {
        let len = self.stages.len();
        if start_index > len {
            return Err(PipelineError::StartOutOfRange {
                start: start_index,
                len,
            });
        }

        if start_index == len {
            run.set_status(RunStatus::Completed);
            self.persist(&mut run).await?;
            return Ok(run.into_run(RunState::Completed));
        }

        for (index, spec) in self.stages.iter().enumerate().skip(start_index) {
            let name = spec.name();
            run.set_status(RunStatus::InProgress {
                stage: name.to_string(),
            });
            run.record_stage_start(index, name);

            let outcome = self.executor.execute(spec, run.record()).await;
            run.record_outcome(index, name, &outcome);

            if !outcome.success {
                let error = outcome
                    .error
                    .unwrap_or_else(|| StageError::unknown("stage failed without reporting an error"));
                error!(
                    record = %run.record().id,
                    stage = name,
                    kind = %error.kind,
                    retries = outcome.retries,
                    error = %error.message,
                    "pipeline stopped"
                );
                run.set_status(RunStatus::Failed {
                    stage: name.to_string(),
                    kind: error.kind,
                    status: error.kind.terminal_status().to_string(),
                    detail: error.message.clone(),
                });
                self.persist(&mut run).await?;
                return Ok(run.into_failed(index, name, error));
            }

            let written = outcome
                .value
                .map(|value| run.merge_artifacts(value))
                .unwrap_or_default();
            let next = match self.stages.get(index + 1) {
                Some(next) => RunStatus::InProgress {
                    stage: next.name().to_string(),
                },
                None => RunStatus::Completed,
            };
            run.set_status(next);
            self.persist(&mut run).await?;
            info!(
                record = %run.record().id,
                stage = name,
                fields = written,
                retries = outcome.retries,
                "stage checkpointed"
            );
        }

        Ok(run.into_run(RunState::Completed))
    }

    async fn persist(&self, run: &mut RunContext) -> Result<(), PipelineError> {
        self.context
            .store()
            .save(run.record())
            .await
            .map_err(|source| PipelineError::Persist {
                id: run.record().id.clone(),
                source,
            })?;
        run.record_persisted();
        Ok(())
    }
}

/// Explicit registration of the stage list.
pub struct PipelineBuilder {
    stages: Vec<StageSpec>,
    max_retries: Option<u32>,
    retry_base_delay: Option<Duration>,
    timeout: Option<Duration>,
}

impl PipelineBuilder {
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            max_retries: None,
            retry_base_delay: None,
            timeout: None,
        }
    }

    /// Retry policy applied to stages added after this call.
    pub fn with_retry_policy(mut self, max_retries: u32, base_delay: Duration) -> Self {
        self.max_retries = Some(max_retries);
        self.retry_base_delay = Some(base_delay);
        self
    }

    /// Deadline applied to stages added after this call.
    pub fn with_stage_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn add_stage<S>(self, stage: S) -> Self
    where
        S: Stage + 'static,
    {
        let spec = StageSpec::new(stage);
        self.add_configured(spec)
    }

    /// Add a spec as-is, ignoring the builder's retry and timeout defaults.
    #[cfg(test)]
    pub fn add_spec(mut self, spec: StageSpec) -> Self {
        self.stages.push(spec);
        self
    }

    /// Register one HTTP-backed stage per `StageKind`, with publishing fanned
    /// out across the configured platforms.
    pub fn with_default_stages(self, config: &Config) -> Result<Self> {
        let client = Arc::new(
            ServiceClient::new(&config.stages).context("Failed to build stage service client")?,
        );

        let mut builder = self
            .with_retry_policy(config.stages.max_retries, config.stages.retry_base_delay())
            .with_stage_timeout(config.stages.timeout());

        for kind in StageKind::ALL {
            builder = match kind {
                StageKind::Publish => {
                    let publish = config.stages.publish_platforms.iter().fold(
                        ParallelStage::new(StageKind::Publish),
                        |stage, platform| {
                            stage.with_branch(HttpStage::publish_to(platform, client.clone()))
                        },
                    );
                    if publish.branch_count() == 0 {
                        warn!("no publish platforms configured");
                    }
                    builder.add_stage(publish)
                }
                kind => builder.add_stage(HttpStage::new(kind, client.clone())),
            };
        }

        Ok(builder)
    }

    pub fn build(self, context: PipelineContext) -> PipelineRunner {
        PipelineRunner::new(self.stages, context)
    }

    fn add_configured(mut self, mut spec: StageSpec) -> Self {
        if let Some(max_retries) = self.max_retries {
            spec = spec.with_max_retries(max_retries);
        }
        if let Some(delay) = self.retry_base_delay {
            spec = spec.with_retry_base_delay(delay);
        }
        if self.timeout.is_some() {
            spec = spec.with_timeout(self.timeout);
        }
        self.stages.push(spec);
        self
    }
}

impl Default for PipelineBuilder {
    fn default() -> Self {
        Self::new()
    }
}
