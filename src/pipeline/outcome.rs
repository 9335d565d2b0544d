use std::time::Duration;

use crate::errors::StageError;

use super::context::PipelineEvent;
use super::record::{Artifacts, WorkRecord};

/// Result of one `StageExecutor::execute` call.
#[derive(Debug, Clone, PartialEq)]
pub struct StageOutcome {
    pub success: bool,
    pub value: Option<Artifacts>,
    pub error: Option<StageError>,
    pub retries: u32,
    pub duration: Duration,
}

impl StageOutcome {
    pub fn succeeded(value: Artifacts, retries: u32, duration: Duration) -> Self {
        Self {
            success: true,
            value: Some(value),
            error: None,
            retries,
            duration,
        }
    }

    pub fn failed(error: StageError, retries: u32, duration: Duration) -> Self {
        Self {
            success: false,
            value: None,
            error: Some(error),
            retries,
            duration,
        }
    }
}

/// Per-stage summary kept after the outcome itself is consumed.
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub index: usize,
    pub name: String,
    pub success: bool,
    pub retries: u32,
    pub duration: Duration,
    pub error: Option<StageError>,
}

/// How a pipeline invocation ended.
#[derive(Debug, Clone, PartialEq)]
pub enum RunState {
    Completed,
    Failed {
        stage_index: usize,
        stage: String,
        error: StageError,
    },
    NotRecoverable {
        reason: String,
    },
}

/// Terminal result returned by the pipeline runner.
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineRun {
    pub record: WorkRecord,
    pub state: RunState,
    pub start_index: usize,
    pub reports: Vec<StageReport>,
    pub events: Vec<PipelineEvent>,
}

#[cfg(test)]
impl PipelineRun {
    pub fn is_completed(&self) -> bool {
        matches!(self.state, RunState::Completed)
    }

    pub fn failure(&self) -> Option<&StageError> {
        match &self.state {
            RunState::Failed { error, .. } => Some(error),
            _ => None,
        }
    }

    pub fn executed_stages(&self) -> Vec<&str> {
        self.reports.iter().map(|report| report.name.as_str()).collect()
    }
}
