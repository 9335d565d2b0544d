use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::errors::ErrorKind;

/// Named artifact fields carried by a record.
pub type Fields = serde_json::Map<String, Value>;

/// Fields produced by one stage, merged into the record on success.
pub type Artifacts = Fields;

/// Whether a field value counts as produced output.
///
/// Null, blank strings, and empty arrays or objects do not.
pub fn is_populated(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::String(text)) => !text.trim().is_empty(),
        Some(Value::Array(items)) => !items.is_empty(),
        Some(Value::Object(map)) => !map.is_empty(),
        Some(Value::Bool(_)) | Some(Value::Number(_)) => true,
    }
}

/// Terminal or in-flight status persisted alongside the artifacts.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum RunStatus {
    #[default]
    Pending,
    InProgress {
        stage: String,
    },
    Completed,
    Failed {
        stage: String,
        kind: ErrorKind,
        status: String,
        detail: String,
    },
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RunStatus::Pending => write!(f, "pending"),
            RunStatus::InProgress { stage } => write!(f, "in progress (next: {stage})"),
            RunStatus::Completed => write!(f, "completed"),
            RunStatus::Failed {
                stage,
                status,
                detail,
                ..
            } => write!(f, "failed at {stage}: {status} ({detail})"),
        }
    }
}

/// The unit of work threaded through the pipeline and checkpointed after every stage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkRecord {
    pub id: String,
    #[serde(default)]
    pub fields: Fields,
    #[serde(default)]
    pub status: RunStatus,
    pub updated_at: DateTime<Utc>,
}

impl WorkRecord {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            fields: Fields::new(),
            status: RunStatus::Pending,
            updated_at: Utc::now(),
        }
    }

    #[cfg(test)]
    pub fn with_field(mut self, key: impl Into<String>, value: Value) -> Self {
        self.fields.insert(key.into(), value);
        self
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        is_populated(self.fields.get(key))
    }

    #[cfg(test)]
    pub fn field_names(&self) -> std::collections::BTreeSet<String> {
        self.fields.keys().cloned().collect()
    }

    /// Merge stage output into the record and return how many fields were written.
    ///
    /// Merging never removes a field: null values in `artifacts` are skipped.
    pub fn merge(&mut self, artifacts: Artifacts) -> usize {
        let mut written = 0;
        for (key, value) in artifacts {
            if value.is_null() {
                continue;
            }
            self.fields.insert(key, value);
            written += 1;
        }
        if written > 0 {
            self.touch();
        }
        written
    }

    pub fn set_status(&mut self, status: RunStatus) {
        self.status = status;
        self.touch();
    }

    fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
