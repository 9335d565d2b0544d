use std::sync::Arc;

use anyhow::{Context, Result, bail};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::Config;
use crate::pipeline::{CircuitBreaker, PipelineContext, PipelineRunner, RunState, WorkRecord};
use crate::preflight::{PreflightGate, PreflightReport, checks};
use crate::recovery::RecoveryPlanner;
use crate::store::{FileStore, MemoryStore, RecordStore};

use super::args::{Cli, Command, RecordArgs, RunArgs};
use super::render;

pub(crate) async fn run(cli: Cli, config: Config) -> Result<()> {
    match cli.command {
        Command::Preflight => handle_preflight(&config).await,
        Command::Run(args) => handle_run(args, &config).await,
        Command::Plan(args) => handle_plan(args, &config).await,
        Command::Status(args) => handle_status(args, &config).await,
    }
}

async fn handle_preflight(config: &Config) -> Result<()> {
    let report = run_preflight(config).await;
    render::print_preflight(&report);
    if !report.can_proceed {
        bail!(
            "Preflight failed (score {}). {}",
            report.overall_score,
            preflight_guidance(config)
        );
    }
    Ok(())
}

async fn handle_run(args: RunArgs, config: &Config) -> Result<()> {
    let store: Arc<dyn RecordStore> = if args.ephemeral {
        info!("ephemeral run, records stay in memory");
        Arc::new(MemoryStore::new())
    } else {
        Arc::new(FileStore::new(&config.store.dir))
    };
    let record = load_or_create(store.as_ref(), args.id).await?;

    if args.skip_preflight {
        warn!(record = %record.id, "preflight skipped");
    } else {
        let report = run_preflight(config).await;
        render::print_preflight(&report);
        if !report.can_proceed {
            bail!(
                "Preflight failed (score {}); not starting record {}. {}",
                report.overall_score,
                record.id,
                preflight_guidance(config)
            );
        }
    }

    let context = pipeline_context(store, config)
        .with_breaker(CircuitBreaker::from_settings(&config.breaker));
    let runner = PipelineRunner::builder()
        .with_default_stages(config)?
        .build(context);

    let run = match args.from {
        Some(kind) => {
            let index = runner
                .index_of(kind)
                .with_context(|| format!("Stage {kind} is not registered"))?;
            info!(record = %record.id, stage = %kind, "starting from requested stage");
            runner.run_from(record, index).await?
        }
        None => runner.run(record).await?,
    };

    for event in &run.events {
        debug!(record = %run.record.id, ?event, "pipeline event");
    }
    render::print_run(&run);
    render::print_metrics(runner.stages());

    match &run.state {
        RunState::Completed | RunState::NotRecoverable { .. } => Ok(()),
        RunState::Failed { stage, error, .. } => {
            let hint = if error.kind.retry_later() {
                format!(" Re-run `reelpipe run {}` later to resume.", run.record.id)
            } else {
                String::new()
            };
            bail!(
                "Stage {stage} failed: {} ({}).{hint}",
                error.kind.terminal_status(),
                error.message
            )
        }
    }
}

async fn handle_plan(args: RecordArgs, config: &Config) -> Result<()> {
    let store = Arc::new(FileStore::new(&config.store.dir));
    let record = load_existing(store.as_ref(), &args.id).await?;
    let runner = PipelineRunner::builder()
        .with_default_stages(config)?
        .build(pipeline_context(store, config));

    let plan = runner.plan(&record);
    render::print_plan(&record, &plan, runner.stages());
    Ok(())
}

async fn handle_status(args: RecordArgs, config: &Config) -> Result<()> {
    let store = FileStore::new(&config.store.dir);
    let record = load_existing(&store, &args.id).await?;
    let json = serde_json::to_string_pretty(&record)
        .with_context(|| format!("Failed to serialize record {}", record.id))?;
    println!("{json}");
    Ok(())
}

fn pipeline_context(store: Arc<dyn RecordStore>, config: &Config) -> PipelineContext {
    let planner = RecoveryPlanner::new().with_terminal_field(&config.store.terminal_field);
    PipelineContext::new(store).with_planner(planner)
}

async fn run_preflight(config: &Config) -> PreflightReport {
    let checks = checks::from_settings(&config.preflight.checks);
    if checks.is_empty() {
        warn!("no health checks configured");
    }
    PreflightGate::from_settings(&config.preflight)
        .run(&checks)
        .await
}

fn preflight_guidance(config: &Config) -> String {
    if config.preflight.checks.is_empty() {
        match Config::config_path() {
            Ok(path) => format!(
                "No health checks are configured; add preflight.checks to {} or pass --skip-preflight.",
                path.display()
            ),
            Err(_) => "No health checks are configured; pass --skip-preflight to run anyway."
                .to_string(),
        }
    } else {
        "Resolve the critical checks above or pass --skip-preflight.".to_string()
    }
}

async fn load_or_create(store: &dyn RecordStore, id: Option<String>) -> Result<WorkRecord> {
    let Some(id) = id else {
        let record = WorkRecord::new(Uuid::new_v4().to_string());
        info!(record = %record.id, "created new record");
        return Ok(record);
    };

    match store
        .load(&id)
        .await
        .with_context(|| format!("Failed to load record {id}"))?
    {
        Some(record) => {
            info!(record = %record.id, status = %record.status, "loaded record");
            Ok(record)
        }
        None => {
            info!(record = %id, "record not found, starting a new one");
            Ok(WorkRecord::new(id))
        }
    }
}

async fn load_existing(store: &dyn RecordStore, id: &str) -> Result<WorkRecord> {
    store
        .load(id)
        .await
        .with_context(|| format!("Failed to load record {id}"))?
        .with_context(|| format!("Record {id} not found"))
}
