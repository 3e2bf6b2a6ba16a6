//! Test simulator client: works for a while, then tells the coordinator it is done.

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "simulator", version, about = "Simulator stand-in for autotester cycles")]
struct Args {
    /// Coordinator base URL
    #[arg(long, default_value = "http://localhost:8080")]
    server: String,

    /// Time spent "working" before reporting done
    #[arg(long, default_value = "10s")]
    work: humantime::Duration,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let args = Args::parse();
    tokio::time::sleep(args.work.into()).await;

    let url = format!("{}/simulator/done", args.server.trim_end_matches('/'));
    reqwest::Client::new()
        .post(&url)
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("POST {url} failed"))?;
    tracing::info!("reported done");
    Ok(())
}
