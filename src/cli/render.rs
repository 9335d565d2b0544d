use colored::*;

use crate::pipeline::{PipelineRun, RunState, StageSpec, WorkRecord};
use crate::preflight::{CheckStatus, OverallStatus, PreflightReport};
use crate::recovery::RecoveryPlan;

pub(crate) fn print_preflight(report: &PreflightReport) {
    println!("{}", "🩺 Preflight".bold());
    for result in report.results.values() {
        let marker = if result.is_critical() {
            "✗".red()
        } else if result.is_warning() {
            "!".yellow()
        } else {
            "✓".green()
        };
        let status = match result.status {
            CheckStatus::Valid => result.status.to_string().green(),
            CheckStatus::RefreshNeeded | CheckStatus::Unknown => result.status.to_string().yellow(),
            _ => result.status.to_string().red(),
        };
        println!(
            "  {} {:<20} {:>3}  {}  {}",
            marker,
            result.name,
            result.score,
            status,
            result.message.dimmed()
        );
    }

    let headline = format!(
        "Overall: {} (score {})",
        report.overall_status, report.overall_score
    );
    let headline = match report.overall_status {
        OverallStatus::Ready => headline.bold().green(),
        OverallStatus::Warning => headline.bold().yellow(),
        OverallStatus::Failed => headline.bold().red(),
    };
    println!("{headline}");
    if !report.critical.is_empty() {
        println!("  Critical: {}", report.critical.join(", ").red());
    }
    if !report.warnings.is_empty() {
        println!("  Warnings: {}", report.warnings.join(", ").yellow());
    }
    println!();
}

pub(crate) fn print_run(run: &PipelineRun) {
    println!("{} {}", "🎬 Record".bold(), run.record.id.bold());
    if run.start_index > 0 {
        println!("  Started at stage {}", run.start_index + 1);
    }

    for report in &run.reports {
        let retries = if report.retries > 0 {
            format!(" after {} retr{}", report.retries, if report.retries == 1 { "y" } else { "ies" })
        } else {
            String::new()
        };
        let elapsed = format!("{:.1}s", report.duration.as_secs_f64());
        match &report.error {
            None => println!(
                "  {} {}. {}{} ({})",
                "✓".green(),
                report.index + 1,
                report.name,
                retries,
                elapsed.dimmed()
            ),
            Some(error) => println!(
                "  {} {}. {}{} ({}): {}",
                "✗".red(),
                report.index + 1,
                report.name.bold(),
                retries,
                elapsed.dimmed(),
                error
            ),
        }
    }

    match &run.state {
        RunState::Completed => println!("{}", "✅ Pipeline completed".bold().green()),
        RunState::Failed { stage, error, .. } => println!(
            "{} at {}: {}",
            "❌ Pipeline failed".bold().red(),
            stage.bold(),
            error.kind.terminal_status()
        ),
        RunState::NotRecoverable { reason } => {
            println!("{} {}", "ℹ️  Nothing to run:".bold(), reason)
        }
    }
    println!("  Status: {}", run.record.status);
    println!();
}

pub(crate) fn print_metrics(stages: &[StageSpec]) {
    let rows: Vec<_> = stages
        .iter()
        .map(|spec| (spec.name(), spec.metrics().snapshot()))
        .filter(|(_, snapshot)| snapshot.executions > 0)
        .collect();
    if rows.is_empty() {
        return;
    }

    println!("{}", "📊 Stage metrics".bold());
    for (name, snapshot) in rows {
        let rate = snapshot
            .success_rate()
            .map(|rate| format!("{:.0}%", rate * 100.0))
            .unwrap_or_else(|| "-".to_string());
        let average = snapshot
            .average_duration()
            .map(|avg| format!("{:.2}s", avg.as_secs_f64()))
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:<24} attempts {:>3}  failures {:>3}  success {:>4}  avg {}",
            name, snapshot.executions, snapshot.failures, rate, average
        );
    }
}

pub(crate) fn print_plan(record: &WorkRecord, plan: &RecoveryPlan, stages: &[StageSpec]) {
    println!("{} {}", "🧭 Record".bold(), record.id.bold());
    println!("  Status: {}", record.status);
    match plan {
        RecoveryPlan::Resume(point) => {
            let next = stages
                .get(point.stage_index)
                .map(|spec| spec.name().to_string())
                .unwrap_or_else(|| "(nothing left)".to_string());
            println!("  Next stage: {}", next.green());
            println!("  Reason: {}", point.reason);
        }
        RecoveryPlan::NotRecoverable { reason } => {
            println!("  {}", "Not recoverable".yellow());
            println!("  Reason: {reason}");
        }
    }
}
