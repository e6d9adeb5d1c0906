mod bootstrap_helpers;
mod event_ingest;
mod startup;

use anyhow::Result;
use clap::Parser;
use penny_cli::Cli;

use crate::bootstrap_helpers::init_tracing;
use crate::startup::run_cli;

/// Release notes answered by "what's new" mentions.
pub(crate) const BUNDLED_CHANGELOG: &str = include_str!("../../../CHANGELOG.md");

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    run_cli(cli).await
}
