//! Logging setup for the `datascrub` binary.
//!
//! Console output goes to stderr so that stdout stays free for reports.
//! When file logging is enabled, a daily rolling `datascrub.<date>.log` is
//! written to the platform data directory (or the configured directory):
//!
//! - Windows: `%APPDATA%/datascrub/logs`
//! - macOS: `~/Library/Application Support/datascrub/logs`
//! - Linux: `~/.local/share/datascrub/logs`
//!
//! `RUST_LOG` overrides the default `info` level.
//!
//! ```no_run
//! use datascrub::config::LoggingSettings;
//!
//! datascrub::logging::init(&LoggingSettings::default())?;
//! tracing::info!("ready");
//! # Ok::<(), anyhow::Error>(())
//! ```

use crate::config::LoggingSettings;
use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _};

const MAX_LOG_FILES: usize = 10;

pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    Ok(base_dir.join("datascrub").join("logs"))
}

fn ensure_dir(dir: &Path) -> Result<()> {
    if !dir.exists() {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create log directory: {}", dir.display()))?;
    }
    Ok(())
}

/// Installs the global subscriber.
///
/// # Errors
///
/// Returns an error if the log directory or file appender cannot be created,
/// or a global subscriber is already installed.
pub fn init(settings: &LoggingSettings) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new("info"))
        .context("Failed to create env filter")?;

    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let (file_layer, log_dir) = if settings.file_logging {
        let log_dir = match &settings.log_dir {
            Some(dir) => dir.clone(),
            None => get_log_dir()?,
        };
        ensure_dir(&log_dir)?;
        let appender = RollingFileAppender::builder()
            .rotation(Rotation::DAILY)
            .max_log_files(MAX_LOG_FILES)
            .filename_prefix("datascrub")
            .filename_suffix("log")
            .build(&log_dir)
            .context("Failed to create log file appender")?;
        let layer = fmt::layer()
            .with_target(true)
            .with_line_number(true)
            .with_file(true)
            .with_ansi(false)
            .with_writer(appender);
        (Some(layer), Some(log_dir))
    } else {
        (None, None)
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    if let Some(dir) = log_dir {
        tracing::debug!("Logging initialized, log directory: {}", dir.display());
    }
    Ok(())
}
