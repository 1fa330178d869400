//! Opt-in timing and render event log.
//!
//! Timing scopes print to stderr when enabled with `--perf`. The event log is
//! a plain text file of timestamped lines, opened with `--render-debug-log`
//! or the `PAGEMAID_RENDER_DEBUG_LOG` environment variable.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{LazyLock, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

/// Environment variable naming a render debug log file.
pub const DEBUG_LOG_ENV: &str = "PAGEMAID_RENDER_DEBUG_LOG";

static ENABLED: AtomicBool = AtomicBool::new(false);
static EVENT_LOG: LazyLock<Mutex<EventLog>> = LazyLock::new(|| Mutex::new(EventLog::default()));

/// Times the enclosing block; reports when dropped.
#[derive(Debug)]
pub struct Scope {
    name: &'static str,
    start: Instant,
}

impl Drop for Scope {
    fn drop(&mut self) {
        let elapsed_ms = self.start.elapsed().as_secs_f64() * 1000.0;
        tracing::trace!(scope = self.name, elapsed_ms, "scope finished");
        if is_enabled() {
            eprintln!("[perf] {}: {:.2} ms", self.name, elapsed_ms);
        }
    }
}

#[derive(Debug)]
struct EventLog {
    start: Instant,
    writer: Option<BufWriter<File>>,
}

impl Default for EventLog {
    fn default() -> Self {
        Self {
            start: Instant::now(),
            writer: None,
        }
    }
}

fn event_log() -> MutexGuard<'static, EventLog> {
    EVENT_LOG.lock().unwrap_or_else(PoisonError::into_inner)
}

pub fn set_enabled(enabled: bool) {
    ENABLED.store(enabled, Ordering::Relaxed);
}

pub fn is_enabled() -> bool {
    ENABLED.load(Ordering::Relaxed)
}

pub fn scope(name: &'static str) -> Scope {
    Scope {
        name,
        start: Instant::now(),
    }
}

/// Open (truncating) the event log at `path`, or close it with `None`.
///
/// # Errors
///
/// Returns an error if the file cannot be created or written.
pub fn set_debug_log_path(path: Option<&Path>) -> std::io::Result<()> {
    let mut log = event_log();
    let Some(path) = path else {
        if let Some(mut writer) = log.writer.take() {
            writer.flush()?;
        }
        return Ok(());
    };
    let mut writer = BufWriter::new(File::create(path)?);
    writeln!(writer, "pagemaid render debug log start")?;
    writer.flush()?;
    log.start = Instant::now();
    log.writer = Some(writer);
    Ok(())
}

/// Log file requested by the environment, if any.
pub fn debug_log_path_from_env() -> Option<PathBuf> {
    std::env::var_os(DEBUG_LOG_ENV)
        .filter(|value| !value.is_empty())
        .map(PathBuf::from)
}

pub fn is_debug_log_enabled() -> bool {
    event_log().writer.is_some()
}

/// Append one event line; a no-op while no log is open.
pub fn log_event(name: &str, detail: impl AsRef<str>) {
    let mut log = event_log();
    let elapsed_ms = log.start.elapsed().as_secs_f64() * 1000.0;
    let Some(writer) = log.writer.as_mut() else {
        return;
    };
    let written = writeln!(writer, "[{elapsed_ms:>10.3} ms] {name}: {}", detail.as_ref())
        .and_then(|()| writer.flush());
    if let Err(err) = written {
        tracing::debug!(error = %err, "render debug log write failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::NamedTempFile;

    #[test]
    fn test_set_enabled_toggles_runtime_flag() {
        set_enabled(true);
        assert!(is_enabled());

        set_enabled(false);
        assert!(!is_enabled());
    }

    #[test]
    fn test_debug_log_path_enables_logging_and_writes() {
        let temp_file = NamedTempFile::new().unwrap();
        set_debug_log_path(Some(temp_file.path())).unwrap();
        assert!(is_debug_log_enabled());
        log_event("renderer.loaded", "https://kroki.io");
        set_debug_log_path(None).unwrap();
        assert!(!is_debug_log_enabled());
        log_event("after.close", "dropped");

        let content = std::fs::read_to_string(temp_file.path()).unwrap();
        assert!(content.starts_with("pagemaid render debug log start\n"));
        assert!(content.contains("renderer.loaded: https://kroki.io"));
        assert!(!content.contains("after.close"));
    }
}
