//! Log setup: stderr plus one timestamped log file per process lifetime.

use anyhow::{Context, Result};
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use time::macros::format_description;
use time::OffsetDateTime;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// `server_YYYYMMDD_HHMMSS.log` for the given instant.
pub fn log_file_name(at: OffsetDateTime) -> String {
    let stamp = at
        .format(format_description!(
            "[year][month][day]_[hour][minute][second]"
        ))
        .unwrap_or_else(|_| at.unix_timestamp().to_string());
    format!("server_{stamp}.log")
}

/// Path of the log file for a process started at `started_at`.
pub fn log_path(log_dir: &Path, started_at: OffsetDateTime) -> PathBuf {
    log_dir.join(log_file_name(started_at))
}

/// Install the global subscriber and return the path of the log file.
///
/// The file name uses `started_at` as given, so pass a local time captured
/// before the tokio runtime spawns its worker threads.
pub fn init(log_dir: &Path, started_at: OffsetDateTime) -> Result<PathBuf> {
    let path = log_path(log_dir, started_at);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(fmt::layer().with_ansi(false).with_writer(Mutex::new(file)))
        .try_init()
        .context("failed to install log subscriber")?;
    Ok(path)
}
