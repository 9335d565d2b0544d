mod cli;
mod client;
mod config;
mod errors;
mod pipeline;
mod preflight;
mod recovery;
mod store;

use anyhow::Result;
use clap::Parser;

use crate::config::Config;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli::init_tracing(cli.verbose);
    let config = Config::load()?;
    cli.run(config).await
}
