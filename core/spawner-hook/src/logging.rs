//! File logging for the hook.
//!
//! stderr belongs to the user-facing notifications, so diagnostics go to
//! `$SPAWNER_HOME/logs/spawner-hook.log` instead.
//!
//! Level: `SPAWNER_DEBUG_LOG=1` forces `debug`; otherwise `SPAWNER_LOG`
//! (an `EnvFilter` directive such as `spawner_core=trace`), default `warn`.

use std::env;
use std::ffi::OsStr;
use std::path::Path;

use fs_err as fs;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

fn debug_enabled() -> bool {
    env::var("SPAWNER_DEBUG_LOG")
        .map(|value| matches!(value.as_str(), "1" | "true" | "TRUE" | "yes" | "YES"))
        .unwrap_or(false)
}

fn filter() -> EnvFilter {
    if debug_enabled() {
        EnvFilter::new("debug")
    } else {
        EnvFilter::try_from_env("SPAWNER_LOG").unwrap_or_else(|_| EnvFilter::new("warn"))
    }
}

/// Installs the subscriber. Returns `None` (logging disabled) when the log
/// file cannot be opened; the hook keeps working either way.
pub fn init(log_file: &Path) -> Option<WorkerGuard> {
    let (log_dir, file_name) = split(log_file)?;
    fs::create_dir_all(log_dir).ok()?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(file_name.to_string_lossy())
        .build(log_dir)
        .ok()?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    tracing_subscriber::fmt()
        .with_env_filter(filter())
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .ok()?;

    Some(guard)
}

fn split(log_file: &Path) -> Option<(&Path, &OsStr)> {
    let dir = log_file.parent().filter(|dir| !dir.as_os_str().is_empty())?;
    Some((dir, log_file.file_name()?))
}
