use std::fmt;
use std::sync::Arc;

use crate::errors::{ErrorKind, StageError};
use crate::recovery::RecoveryPlanner;
use crate::store::RecordStore;

use super::breaker::CircuitBreaker;
use super::outcome::{PipelineRun, RunState, StageOutcome, StageReport};
use super::record::{Artifacts, RunStatus, WorkRecord};

/// Process-wide collaborators handed to the runner at construction time.
#[derive(Clone)]
pub struct PipelineContext {
    store: Arc<dyn RecordStore>,
    breaker: Option<Arc<CircuitBreaker>>,
    planner: RecoveryPlanner,
}

impl fmt::Debug for PipelineContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PipelineContext")
            .field("breaker", &self.breaker)
            .field("planner", &self.planner)
            .finish()
    }
}

impl PipelineContext {
    pub fn new(store: Arc<dyn RecordStore>) -> Self {
        Self {
            store,
            breaker: None,
            planner: RecoveryPlanner::default(),
        }
    }

    pub fn with_breaker(mut self, breaker: CircuitBreaker) -> Self {
        self.breaker = Some(Arc::new(breaker));
        self
    }

    pub fn with_planner(mut self, planner: RecoveryPlanner) -> Self {
        self.planner = planner;
        self
    }

    pub fn store(&self) -> &dyn RecordStore {
        self.store.as_ref()
    }

    pub fn breaker(&self) -> Option<Arc<CircuitBreaker>> {
        self.breaker.clone()
    }

    pub fn planner(&self) -> &RecoveryPlanner {
        &self.planner
    }
}

/// Mutable state of a single run: the record being threaded through the
/// stages plus the audit trail.
#[derive(Debug)]
pub struct RunContext {
    record: WorkRecord,
    start_index: usize,
    reports: Vec<StageReport>,
    events: Vec<PipelineEvent>,
}

impl RunContext {
    pub fn new(record: WorkRecord, start_index: usize) -> Self {
        Self {
            record,
            start_index,
            reports: Vec::new(),
            events: Vec::new(),
        }
    }

    pub fn record(&self) -> &WorkRecord {
        &self.record
    }

    pub fn record_event(&mut self, event: PipelineEvent) {
        self.events.push(event);
    }

    pub fn record_resume(&mut self, stage_index: usize, reason: impl Into<String>) {
        self.record_event(PipelineEvent::Resumed {
            stage_index,
            reason: reason.into(),
        });
    }

    pub fn record_stage_start(&mut self, index: usize, name: &str) {
        self.record_event(PipelineEvent::StageStarted {
            index,
            name: name.to_string(),
        });
    }

    pub fn record_outcome(&mut self, index: usize, name: &str, outcome: &StageOutcome) {
        self.reports.push(StageReport {
            index,
            name: name.to_string(),
            success: outcome.success,
            retries: outcome.retries,
            duration: outcome.duration,
            error: outcome.error.clone(),
        });
        let event = match &outcome.error {
            None => PipelineEvent::StageCompleted {
                index,
                name: name.to_string(),
                retries: outcome.retries,
            },
            Some(error) => PipelineEvent::StageFailed {
                index,
                name: name.to_string(),
                kind: error.kind,
                message: error.message.clone(),
            },
        };
        self.record_event(event);
    }

    pub fn merge_artifacts(&mut self, artifacts: Artifacts) -> usize {
        self.record.merge(artifacts)
    }

    pub fn set_status(&mut self, status: RunStatus) {
        self.record.set_status(status);
    }

    pub fn record_persisted(&mut self) {
        let status = self.record.status.to_string();
        self.record_event(PipelineEvent::RecordPersisted { status });
    }

    pub fn into_run(self, state: RunState) -> PipelineRun {
        let RunContext {
            record,
            start_index,
            reports,
            events,
        } = self;
        PipelineRun {
            record,
            state,
            start_index,
            reports,
            events,
        }
    }

    pub fn into_failed(self, stage_index: usize, stage: &str, error: StageError) -> PipelineRun {
        self.into_run(RunState::Failed {
            stage_index,
            stage: stage.to_string(),
            error,
        })
    }
}

/// Structured audit events emitted while progressing through the pipeline.
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineEvent {
    Resumed {
        stage_index: usize,
        reason: String,
    },
    StageStarted {
        index: usize,
        name: String,
    },
    StageCompleted {
        index: usize,
        name: String,
        retries: u32,
    },
    StageFailed {
        index: usize,
        name: String,
        kind: ErrorKind,
        message: String,
    },
    RecordPersisted {
        status: String,
    },
}
