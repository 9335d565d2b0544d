use anyhow::Result;
use clap::{Args, Parser, Subcommand};

use crate::config::Config;
use crate::pipeline::StageKind;

use super::commands;

/// Entry point for the `reelpipe` command-line interface.
#[derive(Debug, Parser)]
#[command(
    name = "reelpipe",
    about = "Resumable short-video content pipeline",
    version,
    long_about = None
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable debug logging (RUST_LOG takes precedence when set)
    #[arg(short = 'v', long = "verbose", global = true)]
    pub verbose: bool,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Probe every configured health check and print the report.
    Preflight,
    /// Run (or resume) the pipeline for one record.
    Run(RunArgs),
    /// Show where a stored record would resume.
    Plan(RecordArgs),
    /// Print a stored record as JSON.
    Status(RecordArgs),
}

#[derive(Debug, Args)]
pub struct RunArgs {
    /// Record id; a new record is created when omitted or not found.
    pub id: Option<String>,

    /// Run even when preflight would abort.
    #[arg(long)]
    pub skip_preflight: bool,

    /// Start at this stage instead of the planned resume point.
    #[arg(long, value_name = "STAGE")]
    pub from: Option<StageKind>,

    /// Keep the record in memory only; nothing is written to the record store.
    #[arg(long)]
    pub ephemeral: bool,
}

#[derive(Debug, Args)]
pub struct RecordArgs {
    pub id: String,
}

impl Cli {
    pub async fn run(self, config: Config) -> Result<()> {
        commands::run(self, config).await
    }
}
