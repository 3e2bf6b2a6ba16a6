//! Test broker client: registers with the coordinator, works, reports done.

use anyhow::{Context, Result};
use clap::Parser;

#[derive(Debug, Parser)]
#[command(name = "broker", version, about = "Broker stand-in for autotester cycles")]
struct Args {
    /// Broker id (its port), reported to the coordinator
    #[arg(long)]
    port: String,

    /// Coordinator base URL
    #[arg(long, default_value = "http://localhost:8080")]
    server: String,

    /// Time spent "working" between registering and reporting done
    #[arg(long, default_value = "15s")]
    work: humantime::Duration,
}

async fn post_port(client: &reqwest::Client, url: &str, port: &str) -> Result<()> {
    client
        .post(url)
        .form(&[("port", port)])
        .send()
        .await
        .and_then(|r| r.error_for_status())
        .with_context(|| format!("POST {url} failed"))?;
    Ok(())
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
    let client = reqwest::Client::new();
    let server = args.server.trim_end_matches('/');

    post_port(&client, &format!("{server}/init_broker"), &args.port).await?;
    tracing::info!(port = %args.port, "registered");

    tokio::time::sleep(args.work.into()).await;

    post_port(&client, &format!("{server}/done"), &args.port).await?;
    tracing::info!(port = %args.port, "done");
    Ok(())
}
