//! Tracing subscriber setup.
//!
//! Command output owns stdout, so logs go to a daily-rolling file in the data
//! directory unless stderr is requested.

use color_eyre::{eyre::eyre, Result};
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, EnvFilter};

/// Environment variable holding the filter directive, e.g. `linear_facade=debug`.
pub const LOG_ENV: &str = "LINEAR_FACADE_LOG";

pub enum LogTarget {
  Stderr,
  File(PathBuf),
}

impl LogTarget {
  /// `<data dir>/linear-facade/logs`
  pub fn default_file() -> Result<Self> {
    let data_dir = dirs::data_dir()
      .or_else(|| dirs::home_dir().map(|p| p.join(".local/share")))
      .ok_or_else(|| eyre!("Could not determine data directory"))?;

    Ok(Self::File(data_dir.join("linear-facade").join("logs")))
  }
}

/// Install the global subscriber. Keep the returned guard alive until exit so
/// buffered lines are flushed.
pub fn init(target: LogTarget) -> Result<WorkerGuard> {
  let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));

  let (writer, guard) = match target {
    LogTarget::Stderr => tracing_appender::non_blocking(std::io::stderr()),
    LogTarget::File(dir) => {
      std::fs::create_dir_all(&dir)
        .map_err(|e| eyre!("Failed to create log directory {}: {}", dir.display(), e))?;
      let appender = tracing_appender::rolling::daily(dir, "linear-facade.log");
      tracing_appender::non_blocking(appender)
    }
  };

  fmt()
    .with_env_filter(filter)
    .with_writer(writer)
    .with_ansi(false)
    .try_init()
    .map_err(|e| eyre!("Failed to install tracing subscriber: {}", e))?;

  Ok(guard)
}
