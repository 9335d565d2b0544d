use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;
use serde_json::Value;

use crate::config::{DEFAULT_READY_THRESHOLD, DEFAULT_WARN_THRESHOLD};

/// Scores below this are listed as warnings.
pub const WARNING_SCORE: u8 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Valid,
    Expired,
    Invalid,
    Missing,
    RefreshNeeded,
    Unknown,
}

impl fmt::Display for CheckStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            CheckStatus::Valid => "valid",
            CheckStatus::Expired => "expired",
            CheckStatus::Invalid => "invalid",
            CheckStatus::Missing => "missing",
            CheckStatus::RefreshNeeded => "refresh_needed",
            CheckStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

/// Outcome of probing one external capability.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthCheckResult {
    pub name: String,
    pub status: CheckStatus,
    pub score: u8,
    pub message: String,
    pub retriable: bool,
    pub extra: BTreeMap<String, Value>,
}

impl HealthCheckResult {
    /// Scores above 100 are clamped.
    pub fn new(
        name: impl Into<String>,
        status: CheckStatus,
        score: u8,
        message: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            status,
            score: score.min(100),
            message: message.into(),
            retriable: false,
            extra: BTreeMap::new(),
        }
    }

    pub fn valid(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(name, CheckStatus::Valid, 100, message)
    }

    /// Result used when a check times out, errors, or panics.
    pub fn degraded(name: impl Into<String>, message: impl Into<String>, retriable: bool) -> Self {
        Self::new(name, CheckStatus::Unknown, 0, message).retriable(retriable)
    }

    pub fn retriable(mut self, retriable: bool) -> Self {
        self.retriable = retriable;
        self
    }

    pub fn with_extra(mut self, key: impl Into<String>, value: Value) -> Self {
        self.extra.insert(key.into(), value);
        self
    }

    pub fn is_critical(&self) -> bool {
        self.score == 0
    }

    pub fn is_warning(&self) -> bool {
        self.score > 0 && self.score < WARNING_SCORE
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    Ready,
    Warning,
    Failed,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            OverallStatus::Ready => "ready",
            OverallStatus::Warning => "warning",
            OverallStatus::Failed => "failed",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Thresholds {
    pub ready: u8,
    pub warn: u8,
}

impl Thresholds {
    pub fn decide(&self, overall_score: u8, has_critical: bool) -> OverallStatus {
        if overall_score >= self.ready {
            OverallStatus::Ready
        } else if overall_score >= self.warn && !has_critical {
            OverallStatus::Warning
        } else {
            OverallStatus::Failed
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            ready: DEFAULT_READY_THRESHOLD,
            warn: DEFAULT_WARN_THRESHOLD,
        }
    }
}

/// Aggregate go/no-go decision over every health check.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreflightReport {
    pub overall_status: OverallStatus,
    pub overall_score: u8,
    pub results: BTreeMap<String, HealthCheckResult>,
    pub critical: Vec<String>,
    pub warnings: Vec<String>,
    pub can_proceed: bool,
}

impl PreflightReport {
    /// Build a report from results in check order. No checks means score 0.
    pub fn from_results(results: Vec<HealthCheckResult>, thresholds: &Thresholds) -> Self {
        let overall_score = if results.is_empty() {
            0
        } else {
            let total: u32 = results.iter().map(|result| u32::from(result.score)).sum();
            (f64::from(total) / results.len() as f64).round() as u8
        };

        let critical: Vec<String> = results
            .iter()
            .filter(|result| result.is_critical())
            .map(|result| result.name.clone())
            .collect();
        let warnings: Vec<String> = results
            .iter()
            .filter(|result| result.is_warning())
            .map(|result| result.name.clone())
            .collect();

        let overall_status = thresholds.decide(overall_score, !critical.is_empty());

        Self {
            overall_status,
            overall_score,
            results: results
                .into_iter()
                .map(|result| (result.name.clone(), result))
                .collect(),
            critical,
            warnings,
            can_proceed: overall_status != OverallStatus::Failed,
        }
    }
}
