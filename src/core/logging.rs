use std::sync::OnceLock;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::core::config::AppPaths;

/// Rolling file name prefix inside the log directory (`lawbot.log.YYYY-MM-DD`).
pub const LOG_FILE_PREFIX: &str = "lawbot.log";

/// Used when `RUST_LOG` is unset or unparseable. Per-request retrieval and
/// extraction details come from this crate at debug level.
pub const DEFAULT_FILTER: &str = "info,lawbot_backend=debug,tower_http=info";

static LOG_GUARD: OnceLock<WorkerGuard> = OnceLock::new();

fn env_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER))
}

/// Installs the global subscriber: stdout plus a daily-rolling file under
/// `paths.log_dir`.
///
/// Only the first call installs anything.
pub fn init(paths: &AppPaths) {
    if LOG_GUARD.get().is_some() {
        return;
    }

    if let Err(err) = std::fs::create_dir_all(&paths.log_dir) {
        eprintln!(
            "lawbot: cannot create log dir {}: {}",
            paths.log_dir.display(),
            err
        );
    }

    let file_appender = tracing_appender::rolling::daily(&paths.log_dir, LOG_FILE_PREFIX);
    let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
    if LOG_GUARD.set(guard).is_err() {
        return;
    }

    let stdout_layer = tracing_subscriber::fmt::layer().with_target(false);
    let file_layer = tracing_subscriber::fmt::layer()
        .with_ansi(false)
        .with_writer(non_blocking);

    let _ = tracing_subscriber::registry()
        .with(env_filter())
        .with(stdout_layer)
        .with(file_layer)
        .try_init();
}
