//! File-backed logging for the CLI.
//!
//! Events go to a daily-rolling file under `~/.pairlink/logs` so interactive
//! output stays clean; set `PAIRLINK_LOG` to raise verbosity.

use std::env;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

const LOG_DIR: &str = ".pairlink/logs";
const LOG_FILE_PREFIX: &str = "pairlink.log";

/// Initializes logging. The returned guard must stay alive for the duration
/// of the process or buffered events are dropped.
pub fn init() -> Option<WorkerGuard> {
    let home = dirs::home_dir()?;
    let log_dir = home.join(LOG_DIR);

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = env::var("PAIRLINK_LOG")
        .ok()
        .and_then(|directive| EnvFilter::try_new(directive).ok())
        .unwrap_or_else(|| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .init();

    Some(guard)
}
