mod cli;
mod launcher;
mod logging;
mod model;
mod orchestrator;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use time::OffsetDateTime;

fn main() -> Result<()> {
    let args = cli::Cli::parse();
    // The local offset is only readable while the process is single-threaded.
    let started_at = OffsetDateTime::now_local().unwrap_or_else(|_| OffsetDateTime::now_utc());

    tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("failed to build tokio runtime")?
        .block_on(cli::run(args, started_at))
}
