//! Tracing subscriber installation for binaries embedding the library.
//!
//! The library itself only emits `tracing` events; installing a
//! subscriber is the host's choice. These helpers cover the two usual
//! arrangements: console logging filtered by `RUST_LOG`, and non-blocking
//! rolling file logging.

use std::path::Path;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Default filter when `RUST_LOG` is unset.
pub const DEFAULT_LOG_FILTER: &str = "info";

/// Install a console subscriber filtered by `RUST_LOG`.
///
/// Falls back to `default_filter` (or [`DEFAULT_LOG_FILTER`]) when the
/// environment variable is unset. Safe to call more than once; later
/// calls are no-ops.
pub fn init_logging(default_filter: Option<&str>) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or(DEFAULT_LOG_FILTER)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

/// Install a subscriber writing daily-rolled files under `dir`.
///
/// Returns the worker guard; the caller must hold it for the lifetime of
/// the process or buffered log lines are lost.
pub fn init_file_logging(dir: &Path, file_prefix: &str, default_filter: Option<&str>) -> WorkerGuard {
    let appender = tracing_appender::rolling::daily(dir, file_prefix);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_filter.unwrap_or(DEFAULT_LOG_FILTER)));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init();
    guard
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_logging_is_idempotent() {
        init_logging(Some("warn"));
        init_logging(Some("debug"));
    }

    #[test]
    fn test_init_file_logging_creates_writer() {
        let temp = tempfile::TempDir::new().unwrap();
        let guard = init_file_logging(temp.path(), "modlayer.log", None);
        tracing::info!("file logging smoke test");
        drop(guard);
    }
}
