// ABOUTME: Builds the run's tracing subscriber: console output plus an append-only log file
// ABOUTME: Level comes from RUST_LOG and defaults to INFO

use anyhow::{Context, Result};
use chrono::NaiveDateTime;
use std::fs::{self, OpenOptions};
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

/// `<log_dir>/archive_<YYYYMMDD_HHMMSS>.log`
pub fn log_file_path(log_dir: &Path, started_at: NaiveDateTime) -> PathBuf {
    log_dir.join(format!("archive_{}.log", started_at.format("%Y%m%d_%H%M%S")))
}

/// Install the process-wide subscriber for this run
///
/// Every event goes to stdout and, without ANSI colors, to the run log file.
/// Must be called once, before the first event is emitted.
///
/// # Returns
///
/// Path of the log file being appended to.
pub fn init(log_dir: &Path, started_at: NaiveDateTime) -> Result<PathBuf> {
    fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let path = log_file_path(log_dir, started_at);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .with_context(|| format!("Failed to open log file {}", path.display()))?;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .with(
            fmt::layer()
                .with_target(false)
                .with_ansi(false)
                .with_writer(Mutex::new(file)),
        )
        .try_init()
        .context("Failed to install logging subscriber")?;

    Ok(path)
}
