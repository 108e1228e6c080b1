//! Logging infrastructure for Rootstock.
//!
//! Provides structured logging with file output and console output:
//! - Writes to `logs/rootstock.log` (cleared on session start)
//! - Also prints to stdout for CLI tailing
//! - Configurable via RUST_LOG environment variable

use std::fs;
use std::io;
use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::time::LocalTime;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

/// Guard that must be kept alive for the duration of logging.
///
/// Dropping this guard will flush and close the log file writer.
pub struct LoggingGuard {
    _file_guard: WorkerGuard,
}

/// Initialize the logging system.
///
/// Creates the log directory if needed, clears the previous log file, and
/// sets up dual output to both file and stdout. The file layer is plain
/// text; the stdout layer keeps ANSI colors for terminals.
///
/// # Errors
///
/// Returns an error if the log directory cannot be created or the log file
/// cannot be cleared.
pub fn init_logging(log_dir: &str, log_file: &str) -> Result<LoggingGuard, io::Error> {
    fs::create_dir_all(log_dir)?;

    // Clear the previous session's log; handles both existing and missing
    // files.
    let log_path = Path::new(log_dir).join(log_file);
    fs::write(&log_path, "")?;

    let file_appender = tracing_appender::rolling::never(log_dir, log_file);
    let (non_blocking_file, file_guard) = tracing_appender::non_blocking(file_appender);

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_timer(LocalTime::rfc_3339());

    let stdout_layer = tracing_subscriber::fmt::layer()
        .with_writer(io::stdout)
        .with_ansi(true)
        .with_timer(LocalTime::rfc_3339());

    // Defaults to INFO when RUST_LOG is not set.
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(stdout_layer)
        .try_init()
        .map_err(|e| io::Error::new(io::ErrorKind::AlreadyExists, e.to_string()))?;

    Ok(LoggingGuard {
        _file_guard: file_guard,
    })
}

/// Default log directory path.
pub fn default_log_dir() -> &'static str {
    "logs"
}

/// Default log file name.
pub fn default_log_file() -> &'static str {
    "rootstock.log"
}
