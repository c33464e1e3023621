use crate::config::{LogConfig, LogRotation};
use crate::core::{ConfigServerError, Result};
use std::path::Path;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

/// Trace id used for log lines emitted outside any request.
pub const INIT_TRACE_ID: &str = "0000000000000000";

/// Install the global subscriber. `RUST_LOG` wins over `config.level`.
///
/// Lines are written by a background worker; keep the returned guard alive
/// until exit so buffered lines are flushed.
pub fn init_logger(config: &LogConfig) -> Result<WorkerGuard> {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(filter_directive(&config.level)))
        .map_err(|e| ConfigServerError::Config(format!("parse log level: {e}")))?;

    let (writer, guard, to_file) =
        match config.filename.as_ref().filter(|p| !p.as_os_str().is_empty()) {
            Some(path) => {
                let (writer, guard) = tracing_appender::non_blocking(file_appender(path, config)?);
                (writer, guard, true)
            }
            None => {
                let (writer, guard) = tracing_appender::non_blocking(std::io::stderr());
                (writer, guard, false)
            }
        };

    tracing_subscriber::registry()
        .with(filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_ansi(!to_file)
                .with_file(true)
                .with_line_number(true)
                .with_writer(writer),
        )
        .try_init()
        .map_err(|e| ConfigServerError::Config(format!("install logger: {e}")))?;
    Ok(guard)
}

impl From<LogRotation> for Rotation {
    fn from(rotation: LogRotation) -> Self {
        match rotation {
            LogRotation::Minutely => Rotation::MINUTELY,
            LogRotation::Hourly => Rotation::HOURLY,
            LogRotation::Daily => Rotation::DAILY,
            LogRotation::Never => Rotation::NEVER,
        }
    }
}

fn file_appender(path: &Path, config: &LogConfig) -> Result<RollingFileAppender> {
    let prefix = path
        .file_name()
        .and_then(|name| name.to_str())
        .ok_or_else(|| {
            ConfigServerError::Config(format!(
                "log.filename '{}' does not name a file",
                path.display()
            ))
        })?;
    let directory = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(directory)?;

    let mut builder = RollingFileAppender::builder()
        .rotation(config.rotation.into())
        .filename_prefix(prefix);
    if config.max_backups > 0 {
        builder = builder.max_log_files(config.max_backups);
    }
    builder.build(directory).map_err(|e| {
        ConfigServerError::Config(format!("open log file '{}': {e}", path.display()))
    })
}

fn filter_directive(level: &str) -> String {
    let level = match level.trim().to_ascii_lowercase().as_str() {
        "" => "info".to_string(),
        "warning" => "warn".to_string(),
        other => other.to_string(),
    };
    format!("configserver={level},tower_http={level}")
}
