//! Diagnostics for the logger itself
//!
//! The logger reports queue and transport activity through `tracing`. A game
//! that already runs its own subscriber gets those events there; otherwise
//! [`init`] installs a file subscriber under the platform data directory.

use std::path::{Path, PathBuf};

use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::error::{Error, Result};
use crate::settings::LogSettings;

const LOG_FILE_NAME: &str = "ogdlog.log";
const LOG_ENV_VAR: &str = "OGDLOG_LOG";
const CRATE_TARGETS: [&str; 3] = ["ogd_logger", "ogdlog_client", "ogdlog_core"];

/// Where diagnostics go and how verbose they are by default
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoggingOptions {
    pub log_dir: PathBuf,
    /// Level for the logger's own crates when `OGDLOG_LOG` is unset
    pub level: tracing::Level,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            log_dir: get_log_directory(),
            level: tracing::Level::INFO,
        }
    }
}

impl LoggingOptions {
    /// Debug-flagged settings raise the logger's crates to `debug`
    pub fn for_settings(settings: LogSettings) -> Self {
        let level = if settings.is_debug() {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        };
        Self {
            level,
            ..Self::default()
        }
    }

    pub fn with_log_dir(mut self, log_dir: impl Into<PathBuf>) -> Self {
        self.log_dir = log_dir.into();
        self
    }

    /// Filter directive used when `OGDLOG_LOG` is unset, e.g.
    /// `ogd_logger=info,ogdlog_client=info,ogdlog_core=info,warn`
    pub fn default_directive(&self) -> String {
        let level = self.level.to_string().to_ascii_lowercase();
        let mut directive: Vec<String> = CRATE_TARGETS
            .iter()
            .map(|target| format!("{}={}", target, level))
            .collect();
        directive.push("warn".to_string());
        directive.join(",")
    }
}

/// Install the file subscriber with default options.
///
/// Logs are written to `~/.local/share/ogd-logger/logs/`. `OGDLOG_LOG`
/// overrides the filter:
///
/// ```bash
/// OGDLOG_LOG=ogdlog_client=trace ./my-game
/// ```
pub fn init() -> Result<()> {
    init_with(LoggingOptions::default())
}

pub fn init_with_dir(log_dir: &Path) -> Result<()> {
    init_with(LoggingOptions::default().with_log_dir(log_dir))
}

/// Install the file subscriber.
///
/// Fails with [`Error::Logging`] if a global subscriber already exists.
pub fn init_with(options: LoggingOptions) -> Result<()> {
    std::fs::create_dir_all(&options.log_dir)?;

    let file_appender = RollingFileAppender::new(Rotation::DAILY, &options.log_dir, LOG_FILE_NAME);
    let env_filter = EnvFilter::try_from_env(LOG_ENV_VAR)
        .or_else(|_| EnvFilter::try_new(options.default_directive()))
        .map_err(|e| Error::logging(e.to_string()))?;

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_target(true)
                .with_timer(fmt::time::ChronoLocal::new(
                    "%Y-%m-%d %H:%M:%S%.3f".to_string(),
                )),
        )
        .try_init()
        .map_err(|e| Error::logging(e.to_string()))?;

    tracing::info!(
        log_dir = %options.log_dir.display(),
        level = %options.level,
        "OGD logger diagnostics started"
    );
    Ok(())
}

fn get_log_directory() -> PathBuf {
    let base = dirs::data_local_dir().unwrap_or_else(|| PathBuf::from("."));
    base.join("ogd-logger").join("logs")
}

/// Path of the rolling log file (the appender adds a date suffix)
pub fn get_current_log_file() -> PathBuf {
    get_log_directory().join(LOG_FILE_NAME)
}
