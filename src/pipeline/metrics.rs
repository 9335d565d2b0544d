use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Cumulative per-stage counters, kept for the lifetime of the process.
#[derive(Debug, Default)]
pub struct StageMetrics {
    executions: AtomicU64,
    failures: AtomicU64,
    total_duration_micros: AtomicU64,
}

impl StageMetrics {
    pub fn record_attempt(&self, success: bool, duration: Duration) {
        self.executions.fetch_add(1, Ordering::Relaxed);
        if !success {
            self.failures.fetch_add(1, Ordering::Relaxed);
        }
        let micros = u64::try_from(duration.as_micros()).unwrap_or(u64::MAX);
        self.total_duration_micros
            .fetch_add(micros, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            executions: self.executions.load(Ordering::Relaxed),
            failures: self.failures.load(Ordering::Relaxed),
            total_duration: Duration::from_micros(
                self.total_duration_micros.load(Ordering::Relaxed),
            ),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MetricsSnapshot {
    pub executions: u64,
    pub failures: u64,
    pub total_duration: Duration,
}

impl MetricsSnapshot {
    pub fn successes(&self) -> u64 {
        self.executions.saturating_sub(self.failures)
    }

    /// Fraction of attempts that succeeded, or `None` before the first attempt.
    pub fn success_rate(&self) -> Option<f64> {
        (self.executions > 0).then(|| self.successes() as f64 / self.executions as f64)
    }

    pub fn average_duration(&self) -> Option<Duration> {
        let executions = u32::try_from(self.executions).ok().filter(|n| *n > 0)?;
        Some(self.total_duration / executions)
    }
}
