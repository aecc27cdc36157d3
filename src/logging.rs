use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "QRDASH_LOG";

/// Directory holding the daily log files ($XDG_DATA_HOME/qrdash/logs).
pub fn log_dir() -> Result<PathBuf> {
  dirs::data_dir()
    .map(|dir| dir.join("qrdash").join("logs"))
    .ok_or_else(|| eyre!("Could not determine data directory for logs"))
}

/// Initialize logging to a daily rolling file.
///
/// The terminal belongs to the UI, so nothing is written to stdout. The filter
/// comes from QRDASH_LOG, then `level`, then "info". Keep the returned guard
/// alive for the whole run or buffered lines are lost.
pub fn init_logging(level: Option<&str>) -> Result<WorkerGuard> {
  let dir = log_dir()?;
  std::fs::create_dir_all(&dir)
    .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;

  let appender = tracing_appender::rolling::daily(&dir, "qrdash.log");
  let (writer, guard) = tracing_appender::non_blocking(appender);

  tracing_subscriber::fmt()
    .with_env_filter(env_filter(level))
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to initialize logging: {}", e))?;

  tracing::info!(dir = %dir.display(), "logging initialized");
  Ok(guard)
}

fn env_filter(level: Option<&str>) -> EnvFilter {
  EnvFilter::try_from_env(LOG_ENV)
    .ok()
    .or_else(|| level.and_then(|l| EnvFilter::try_new(l).ok()))
    .unwrap_or_else(|| EnvFilter::new("info"))
}
