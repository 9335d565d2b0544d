//! Typed error hierarchy for the pipeline core.
//!
//! - `ErrorKind`: the failure taxonomy used to decide retry versus abort
//! - `StageError`: what a stage body (or its validation) reports
//! - `StoreError`: record persistence failures
//! - `PipelineError`: failures of the runner itself, not of a stage

use std::fmt;
use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Failure classes a stage can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidInput,
    TransientUpstream,
    QuotaExhausted,
    PermanentUpstream,
    Unknown,
}

impl ErrorKind {
    /// Whether the stage executor may retry within its own budget.
    pub fn is_retriable(self) -> bool {
        matches!(self, ErrorKind::TransientUpstream)
    }

    /// Whether the whole run is worth retrying later, after a pause.
    pub fn retry_later(self) -> bool {
        matches!(self, ErrorKind::QuotaExhausted | ErrorKind::TransientUpstream)
    }

    /// Human-readable status persisted on a failed record.
    pub fn terminal_status(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid input",
            ErrorKind::TransientUpstream => "upstream unavailable after retries",
            ErrorKind::QuotaExhausted => "quota exhausted, retry the run later",
            ErrorKind::PermanentUpstream => "upstream rejected the request",
            ErrorKind::Unknown => "unknown failure",
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::InvalidInput => "invalid_input",
            ErrorKind::TransientUpstream => "transient_upstream",
            ErrorKind::QuotaExhausted => "quota_exhausted",
            ErrorKind::PermanentUpstream => "permanent_upstream",
            ErrorKind::Unknown => "unknown",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ErrorKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "invalid_input" => Ok(ErrorKind::InvalidInput),
            "transient_upstream" => Ok(ErrorKind::TransientUpstream),
            "quota_exhausted" => Ok(ErrorKind::QuotaExhausted),
            "permanent_upstream" => Ok(ErrorKind::PermanentUpstream),
            "unknown" => Ok(ErrorKind::Unknown),
            other => Err(anyhow::anyhow!("Unknown error kind '{other}'")),
        }
    }
}

/// Error reported by a stage body or one of its validators.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{kind}: {message}")]
pub struct StageError {
    pub kind: ErrorKind,
    pub message: String,
}

impl StageError {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::InvalidInput, message)
    }

    pub fn transient(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::TransientUpstream, message)
    }

    #[cfg(test)]
    pub fn quota(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::QuotaExhausted, message)
    }

    #[cfg(test)]
    pub fn permanent(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::PermanentUpstream, message)
    }

    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::Unknown, message)
    }

    /// Output validation failures are retried like a failed run.
    pub fn invalid_output(message: impl Into<String>) -> Self {
        Self::new(
            ErrorKind::TransientUpstream,
            format!("output rejected: {}", message.into()),
        )
    }

    pub fn is_retriable(&self) -> bool {
        self.kind.is_retriable()
    }
}

/// Errors from a record store.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Failed to read record at {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to write record at {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Record {id} is not valid JSON: {source}")]
    Corrupt {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to serialize record {id}: {source}")]
    Serialize {
        id: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid record id '{0}'")]
    InvalidId(String),
}

/// Errors from the pipeline runner itself.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("Start index {start} is beyond the {len} configured stages")]
    StartOutOfRange { start: usize, len: usize },

    #[error("Failed to persist record {id}: {source}")]
    Persist {
        id: String,
        #[source]
        source: StoreError,
    },
}
