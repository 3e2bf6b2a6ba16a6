use crate::launcher::LauncherKind;
use crate::model::CoordinatorConfig;
use crate::orchestrator::Coordinator;
use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use time::OffsetDateTime;
use tracing::info;

#[derive(Debug, Parser, Clone)]
#[command(
    name = "autotester",
    version,
    about = "Runs broker/simulator integration-test cycles in a loop, driven over HTTP"
)]
pub struct Cli {
    /// Address the HTTP server listens on
    #[arg(long, default_value = "0.0.0.0:8080")]
    pub listen: String,

    /// Number of registered brokers that makes a cycle ready
    #[arg(long, default_value_t = 3)]
    pub max_brokers: usize,

    /// How often to check whether the current cycle can restart
    #[arg(long, default_value = "1s")]
    pub restart_check_interval: humantime::Duration,

    /// How often to check whether all brokers have registered
    #[arg(long, default_value = "1s")]
    pub broker_ready_check_interval: humantime::Duration,

    /// Countdown before a finished cycle is restarted
    #[arg(long, default_value = "10s")]
    pub restart_countdown: humantime::Duration,

    /// Log brokers that are still not done after this long
    #[arg(long, default_value = "3m")]
    pub stall_threshold: humantime::Duration,

    /// How often to look for stalled brokers
    #[arg(long, default_value = "5m")]
    pub stall_check_interval: humantime::Duration,

    /// Working directory for broker and simulator commands
    #[arg(long, default_value = ".")]
    pub base_dir: PathBuf,

    /// Script that launches every broker, relative to --base-dir
    #[arg(long, default_value = "scripts/broker.sh")]
    pub broker_script: String,

    /// Simulator entry point, relative to --base-dir
    #[arg(long, default_value = "scripts/simulator.sh")]
    pub simulator_file: String,

    /// How broker and simulator commands are started
    #[arg(long, value_enum, default_value = "terminal")]
    pub launcher: LauncherKind,

    /// Directory for the timestamped log file
    #[arg(long, default_value = ".")]
    pub log_dir: PathBuf,

    /// Use --start-on-launch true to begin the first cycle without waiting for POST /start
    #[arg(long, default_value_t = false, action = clap::ArgAction::Set)]
    pub start_on_launch: bool,
}

/// Build a `CoordinatorConfig` from CLI arguments.
pub fn build_config(args: &Cli) -> CoordinatorConfig {
    CoordinatorConfig {
        max_broker_count: args.max_brokers,
        restart_check_interval: Duration::from(args.restart_check_interval),
        broker_ready_check_interval: Duration::from(args.broker_ready_check_interval),
        restart_countdown: Duration::from(args.restart_countdown),
        stall_threshold: Duration::from(args.stall_threshold),
        stall_check_interval: Duration::from(args.stall_check_interval),
        base_dir: args.base_dir.clone(),
        broker_script: args.broker_script.clone(),
        simulator_file: args.simulator_file.clone(),
    }
}

/// `started_at` names the log file; it is taken before the runtime starts so the
/// local offset can still be read.
pub async fn run(args: Cli, started_at: OffsetDateTime) -> Result<()> {
    let log_path = crate::logging::init(&args.log_dir, started_at)?;
    let cfg = build_config(&args);
    let config = serde_json::to_string(&cfg).context("failed to serialize config")?;
    info!(log = %log_path.display(), %config, "autotester starting");

    let coordinator = Coordinator::new(cfg, args.launcher.build());
    if args.start_on_launch {
        coordinator.start();
    }

    let listener = tokio::net::TcpListener::bind(&args.listen)
        .await
        .with_context(|| format!("failed to bind {}", args.listen))?;
    info!(addr = %args.listen, "listening");

    let app = crate::server::router(Arc::clone(&coordinator));
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(Arc::clone(&coordinator)))
        .await
        .context("http server failed")?;
    info!("stopped");
    Ok(())
}

async fn shutdown_signal(coordinator: Arc<Coordinator>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "failed to listen for ctrl-c");
        std::future::pending::<()>().await;
    }
    info!("shutting down");
    coordinator.shutdown();
}
