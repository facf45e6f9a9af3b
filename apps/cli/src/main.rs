//! `materialize` — run a resource materializer stage from the command line.
//!
//! Loads a stage manifest and a resource map, fetches and transforms the
//! resources the stage owns, and writes the resulting map as JSON.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
