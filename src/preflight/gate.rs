use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use async_trait::async_trait;
use futures::FutureExt;
use futures::future::join_all;
use tracing::{error, info, warn};

use crate::config::PreflightSettings;

use super::types::{HealthCheckResult, PreflightReport, Thresholds};

/// Probe of one external capability (credential, quota, connectivity).
///
/// A probe may refresh a short-lived credential on its own; the gate only
/// invokes it.
#[async_trait]
pub trait HealthCheck: Send + Sync {
    fn name(&self) -> &str;

    /// Per-check deadline; `None` uses the gate's default.
    fn timeout(&self) -> Option<Duration> {
        None
    }

    async fn probe(&self) -> Result<HealthCheckResult>;
}

/// Runs every health check concurrently and aggregates the results. Never fails.
#[derive(Debug, Clone)]
pub struct PreflightGate {
    thresholds: Thresholds,
    default_timeout: Duration,
}

impl PreflightGate {
    pub fn new(thresholds: Thresholds, default_timeout: Duration) -> Self {
        Self {
            thresholds,
            default_timeout,
        }
    }

    pub fn from_settings(settings: &PreflightSettings) -> Self {
        Self::new(
            Thresholds {
                ready: settings.ready_threshold,
                warn: settings.warn_threshold,
            },
            Duration::from_secs(settings.check_timeout_secs),
        )
    }

    /// Checks are keyed by name; a later check reusing a name is skipped.
    pub async fn run(&self, checks: &[Arc<dyn HealthCheck>]) -> PreflightReport {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(checks.len());
        for check in checks {
            if seen.insert(check.name()) {
                unique.push(check.as_ref());
            } else {
                warn!(check = check.name(), "duplicate health check name, skipping");
            }
        }
        let probes = unique.into_iter().map(|check| self.probe_one(check));
        let results = join_all(probes).await;
        let report = PreflightReport::from_results(results, &self.thresholds);
        info!(
            status = %report.overall_status,
            score = report.overall_score,
            critical = report.critical.len(),
            warnings = report.warnings.len(),
            "preflight finished"
        );
        report
    }

    async fn probe_one(&self, check: &dyn HealthCheck) -> HealthCheckResult {
        let name = check.name().to_string();
        let limit = check.timeout().unwrap_or(self.default_timeout);
        let probe = AssertUnwindSafe(check.probe()).catch_unwind();

        let mut result = match tokio::time::timeout(limit, probe).await {
            Err(_) => HealthCheckResult::degraded(
                &name,
                format!("no answer within {}s", limit.as_secs_f64()),
                true,
            ),
            Ok(Err(_)) => HealthCheckResult::degraded(&name, "check panicked", false),
            Ok(Ok(Err(err))) => {
                HealthCheckResult::degraded(&name, format!("check failed: {err:#}"), false)
            }
            Ok(Ok(Ok(result))) => result,
        };
        result.name = name;
        result.score = result.score.min(100);

        if result.is_critical() {
            error!(check = %result.name, status = %result.status, message = %result.message, "health check critical");
        } else if result.is_warning() {
            warn!(check = %result.name, score = result.score, message = %result.message, "health check degraded");
        } else {
            info!(check = %result.name, score = result.score, "health check passed");
        }
        result
    }
}

impl Default for PreflightGate {
    fn default() -> Self {
        Self::from_settings(&PreflightSettings::default())
    }
}
