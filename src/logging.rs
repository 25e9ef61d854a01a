//! Structured logging setup shared by the CLI and RPC binaries.
//!
//! Installs a `tracing-subscriber` registry with an `RUST_LOG`-driven
//! env-filter (defaulting to `info`) writing to stderr, plus a
//! `tracing-appender` daily-rotating file sink under
//! `~/.luminary/logs/luminary.log`. The file guard is returned and must be
//! kept alive for the process's lifetime or buffered lines are lost on
//! exit.

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::fmt::writer::MakeWriterExt;
use tracing_subscriber::EnvFilter;

/// Initializes global logging. `verbose` raises the default level to
/// `debug` when `RUST_LOG` isn't set.
pub fn init(verbose: bool) -> WorkerGuard {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));

    let log_dir = dirs::home_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join(".luminary")
        .join("logs");
    let _ = std::fs::create_dir_all(&log_dir);

    let file_appender = tracing_appender::rolling::daily(&log_dir, "luminary.log");
    let (file_writer, guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr.and(file_writer))
        .with_ansi(false)
        .init();

    guard
}
