//! Tracing subscriber setup: stderr or daily-rotated file, text or JSON.

use crate::config::LogFormat;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

/// Initialize the global tracing subscriber. `RUST_LOG` overrides `level`.
///
/// Returns a guard when logging to a file; it **must be held** for the life
/// of the process so buffered lines are flushed on shutdown.
pub fn init_logging(
    level: &str,
    format: LogFormat,
    to_file: bool,
    log_dir: Option<&str>,
) -> Option<WorkerGuard> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let builder = tracing_subscriber::fmt().with_env_filter(env_filter);

    if to_file {
        let dir = log_dir.unwrap_or("./logs");
        let file_appender = tracing_appender::rolling::daily(dir, "model-gateway.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(file_appender);
        let builder = builder.with_writer(non_blocking).with_ansi(false);

        match format {
            LogFormat::Json => builder.json().init(),
            LogFormat::Text => builder.init(),
        }
        Some(guard)
    } else {
        match format {
            LogFormat::Json => builder.json().init(),
            LogFormat::Text => builder.init(),
        }
        None
    }
}
