use std::env;
use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::OnceLock;

use thiserror::Error;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::fmt::time::{LocalTime, UtcTime};
use tracing_subscriber::layer::{Layer, SubscriberExt};
use tracing_subscriber::util::SubscriberInitExt;

use crate::config::config_directory;

const LOG_FILE_NAME: &str = "folio.log";
const FILTER_ENV: &str = "FOLIO_LOG";

/// Where log events go.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoggingDestination {
    /// JSON file under the config directory plus human-readable stderr.
    FileAndStderr,
    /// JSON file only (`--quiet`).
    FileOnly,
    /// Stderr only; nothing touches the config directory.
    StderrOnly,
}

impl LoggingDestination {
    fn writes_file(self) -> bool {
        matches!(
            self,
            LoggingDestination::FileAndStderr | LoggingDestination::FileOnly
        )
    }

    fn writes_stderr(self) -> bool {
        matches!(
            self,
            LoggingDestination::FileAndStderr | LoggingDestination::StderrOnly
        )
    }
}

#[derive(Debug)]
struct LoggingState {
    _guard: Option<WorkerGuard>,
    log_path: Option<PathBuf>,
}

static LOGGING_STATE: OnceLock<LoggingState> = OnceLock::new();

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("failed to prepare log directory: {0}")]
    Io(#[from] io::Error),
    #[error("invalid logging filter: {0}")]
    Filter(#[from] ParseError),
    #[error("failed to install logging subscriber: {0}")]
    Subscriber(#[from] tracing_subscriber::util::TryInitError),
}

/// Installs the global subscriber. Only the first call has any effect; every
/// call returns the log file path, if one is being written.
pub fn init_logging(
    destination: LoggingDestination,
) -> Result<Option<&'static PathBuf>, LoggingError> {
    if LOGGING_STATE.get().is_none() {
        let state = install(destination)?;
        let _ = LOGGING_STATE.set(state);
    }
    Ok(current_log_path())
}

pub fn current_log_path() -> Option<&'static PathBuf> {
    LOGGING_STATE
        .get()
        .and_then(|state| state.log_path.as_ref())
}

fn install(destination: LoggingDestination) -> Result<LoggingState, LoggingError> {
    let filter = build_filter(env::var(FILTER_ENV).ok().as_deref())?;

    let (file_layer, guard, log_path) = if destination.writes_file() {
        let dir = config_directory().join("logs");
        fs::create_dir_all(&dir)?;
        let appender = tracing_appender::rolling::never(&dir, LOG_FILE_NAME);
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let layer = tracing_subscriber::fmt::layer()
            .event_format(
                tracing_subscriber::fmt::format()
                    .json()
                    .with_timer(UtcTime::rfc_3339())
                    .with_level(true)
                    .with_target(true)
                    .with_file(true)
                    .with_line_number(true),
            )
            .with_writer(writer)
            .with_ansi(false)
            .boxed();
        (Some(layer), Some(guard), Some(dir.join(LOG_FILE_NAME)))
    } else {
        (None, None, None)
    };

    let stderr_layer = destination.writes_stderr().then(|| {
        tracing_subscriber::fmt::layer()
            .event_format(
                tracing_subscriber::fmt::format()
                    .with_timer(LocalTime::rfc_3339())
                    .with_level(true)
                    .with_target(false)
                    .with_ansi(false),
            )
            .with_writer(io::stderr)
            .with_ansi(false)
            .boxed()
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()?;

    if let Some(path) = log_path.as_ref() {
        info!(path = %path.display(), "Structured logging enabled");
    }

    Ok(LoggingState {
        _guard: guard,
        log_path,
    })
}

/// `FOLIO_LOG` if set and non-blank, then `RUST_LOG`, then `info`.
fn build_filter(folio_log: Option<&str>) -> Result<EnvFilter, ParseError> {
    if let Some(spec) = folio_log.filter(|spec| !spec.trim().is_empty()) {
        return EnvFilter::try_new(spec);
    }
    match EnvFilter::try_from_default_env() {
        Ok(filter) => Ok(filter),
        Err(_) => EnvFilter::try_new("info"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn destinations_route_to_expected_sinks() {
        assert!(LoggingDestination::FileAndStderr.writes_file());
        assert!(LoggingDestination::FileAndStderr.writes_stderr());
        assert!(!LoggingDestination::FileOnly.writes_stderr());
        assert!(!LoggingDestination::StderrOnly.writes_file());
    }

    #[test]
    fn explicit_filter_is_parsed() {
        let filter = build_filter(Some("folio_core=debug")).expect("valid filter");
        assert!(filter.to_string().contains("folio_core=debug"));
    }
}
