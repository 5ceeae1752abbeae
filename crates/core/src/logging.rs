use std::path::Path;
use tracing::warn;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

/// Installs the global subscriber: a daily-rolling file under `log_dir` named
/// after `component`, plus stderr when `to_stderr` is set.
///
/// When a global subscriber is already installed it stays in place and the
/// refusal is reported through it. Keep the returned guard alive for as long
/// as logs should be flushed.
pub fn init_logging(log_dir: &Path, component: &str, to_stderr: bool) -> WorkerGuard {
    let (guard, installed) = try_init_logging(log_dir, component, to_stderr);
    if let Err(e) = installed {
        warn!(
            component,
            "Logging already initialized, keeping the existing subscriber: {}", e
        );
    }
    guard
}

/// Like [`init_logging`], but hands the installation outcome to the caller.
pub fn try_init_logging(
    log_dir: &Path,
    component: &str,
    to_stderr: bool,
) -> (WorkerGuard, Result<(), TryInitError>) {
    if let Err(e) = std::fs::create_dir_all(log_dir) {
        eprintln!("Cannot create log directory {}: {}", log_dir.display(), e);
    }

    // server.log.2024-01-21
    let appender = tracing_appender::rolling::daily(log_dir, format!("{component}.log"));
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true);
    let stderr_layer = to_stderr.then(|| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
    });

    let installed = tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init();
    (guard, installed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_installation_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let log_dir = dir.path().join("logs");

        let (_first, _) = try_init_logging(&log_dir, "first", false);
        assert!(log_dir.is_dir());

        let (_second, installed) = try_init_logging(&log_dir, "second", true);
        assert!(installed.is_err());

        // Still usable, only warns.
        let _third = init_logging(&log_dir, "third", false);
    }
}
