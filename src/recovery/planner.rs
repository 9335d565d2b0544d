use tracing::debug;

use crate::config::DEFAULT_TERMINAL_FIELD;
use crate::pipeline::{StageSpec, WorkRecord, is_populated};

use super::predicates::CompletionPredicate;
use super::types::{RecoveryPlan, ResumePoint};

/// Derives the resume point of a record from the artifacts it already carries.
///
/// Progress is read from the data itself rather than from a stored pointer, so
/// a crash between producing an artifact and recording progress still resumes
/// at the right stage.
#[derive(Debug, Clone)]
pub struct RecoveryPlanner {
    terminal_field: String,
}

impl RecoveryPlanner {
    pub fn new() -> Self {
        Self {
            terminal_field: DEFAULT_TERMINAL_FIELD.to_string(),
        }
    }

    pub fn with_terminal_field(mut self, field: impl Into<String>) -> Self {
        self.terminal_field = field.into();
        self
    }

    #[cfg(test)]
    pub fn terminal_field(&self) -> &str {
        &self.terminal_field
    }

    pub fn plan(&self, record: &WorkRecord, stages: &[StageSpec]) -> RecoveryPlan {
        let predicates: Vec<(&str, CompletionPredicate)> = stages
            .iter()
            .map(|spec| (spec.name(), spec.completion()))
            .collect();
        self.plan_with(record, &predicates)
    }

    /// Evaluate `predicates` (one per stage, in stage order) from the last
    /// stage backward.
    pub fn plan_with(
        &self,
        record: &WorkRecord,
        predicates: &[(&str, CompletionPredicate)],
    ) -> RecoveryPlan {
        if is_populated(record.get(&self.terminal_field)) {
            return RecoveryPlan::NotRecoverable {
                reason: format!(
                    "record {} already carries '{}'; nothing left to do",
                    record.id, self.terminal_field
                ),
            };
        }

        for (index, (name, is_complete)) in predicates.iter().enumerate().rev() {
            if is_complete(&record.fields) {
                debug!(record = %record.id, stage = %name, index, "latest completed stage");
                let reason = match predicates.get(index + 1) {
                    Some((next, _)) => format!("{name} output present; continuing with {next}"),
                    None => format!("{name} output present; every stage is complete"),
                };
                return RecoveryPlan::Resume(ResumePoint {
                    stage_index: index + 1,
                    reason,
                });
            }
        }

        RecoveryPlan::Resume(ResumePoint::restart())
    }
}

impl Default for RecoveryPlanner {
    fn default() -> Self {
        Self::new()
    }
}
