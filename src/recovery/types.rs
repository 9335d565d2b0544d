use std::fmt;

/// Where a partially-completed run should continue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResumePoint {
    pub stage_index: usize,
    pub reason: String,
}

impl ResumePoint {
    pub fn restart() -> Self {
        Self {
            stage_index: 0,
            reason: "no stage output found; starting from the first stage".to_string(),
        }
    }
}

/// Result of inspecting a record before a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecoveryPlan {
    Resume(ResumePoint),
    NotRecoverable { reason: String },
}

impl RecoveryPlan {
    #[cfg(test)]
    pub fn resume_index(&self) -> Option<usize> {
        match self {
            RecoveryPlan::Resume(point) => Some(point.stage_index),
            RecoveryPlan::NotRecoverable { .. } => None,
        }
    }
}

impl fmt::Display for RecoveryPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecoveryPlan::Resume(point) => {
                write!(f, "resume at stage {} ({})", point.stage_index, point.reason)
            }
            RecoveryPlan::NotRecoverable { reason } => write!(f, "not recoverable: {reason}"),
        }
    }
}
