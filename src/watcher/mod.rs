//! Watching an input file for `render --watch`.
//!
//! Uses the notify crate for cross-platform file system events, forwarded to
//! a tokio channel so the render loop can await them.
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::time::Duration;

use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::mpsc::{self, UnboundedReceiver};

/// Debounce used by the CLI.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(200);

/// Watches a single file and yields debounced change notifications.
pub struct FileWatcher {
    _watcher: RecommendedWatcher,
    rx: UnboundedReceiver<notify::Result<Event>>,
    watch_root: PathBuf,
    target_path: PathBuf,
    target_name: Option<OsString>,
    ignored: Vec<PathBuf>,
    debounce: Duration,
}

impl FileWatcher {
    /// Create a watcher for `path`.
    ///
    /// # Errors
    /// Returns an error if the file watcher cannot be created or the path cannot be watched.
    pub fn new(path: impl AsRef<Path>, debounce: Duration) -> notify::Result<Self> {
        // Event paths from the OS are absolute and canonical.
        let target_path = canonical_lossy(path.as_ref());
        let target_name = target_path.file_name().map(std::ffi::OsStr::to_os_string);
        let watch_root = watch_root_for(&target_path);

        let (tx, rx) = mpsc::unbounded_channel();
        let mut watcher = notify::recommended_watcher(move |res| {
            let _ = tx.send(res);
        })?;
        watcher.watch(&watch_root, RecursiveMode::NonRecursive)?;

        Ok(Self {
            _watcher: watcher,
            rx,
            watch_root,
            target_path,
            target_name,
            ignored: Vec::new(),
            debounce,
        })
    }

    /// Ignore events for `path`, such as an output file written next to the
    /// watched input.
    pub fn with_ignored(mut self, path: impl AsRef<Path>) -> Self {
        self.ignored.push(canonical_lossy(path.as_ref()));
        self
    }

    /// The canonical path of the file being watched.
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Wait for the next change, returning once no further relevant event has
    /// arrived for the debounce period. Returns `false` if the watcher stopped.
    pub async fn changed(&mut self) -> bool {
        loop {
            match self.rx.recv().await {
                Some(event) => {
                    if self.accept(event) {
                        break;
                    }
                }
                None => return false,
            }
        }
        loop {
            match tokio::time::timeout(self.debounce, self.rx.recv()).await {
                Err(_elapsed) => return true,
                Ok(Some(event)) => {
                    self.accept(event);
                }
                Ok(None) => return true,
            }
        }
    }

    fn accept(&self, event: notify::Result<Event>) -> bool {
        match event {
            Ok(ev) if self.is_relevant(&ev) => true,
            Ok(ev) => {
                crate::perf::log_event(
                    "watcher.irrelevant",
                    format!("kind={:?} paths={:?}", ev.kind, ev.paths),
                );
                false
            }
            Err(err) => {
                tracing::debug!(error = %err, "watch error");
                crate::perf::log_event("watcher.error", err.to_string());
                false
            }
        }
    }

    fn is_relevant(&self, event: &Event) -> bool {
        if event.paths.iter().all(|path| self.ignored.contains(path)) && !event.paths.is_empty() {
            return false;
        }
        event.paths.iter().any(|path| {
            path == &self.watch_root
                || path == &self.target_path
                || self
                    .target_name
                    .as_ref()
                    .is_some_and(|name| path.file_name().is_some_and(|f| f == name))
        })
    }
}

/// Canonical form of `path`, resolving just the parent when the file does not
/// exist yet.
fn canonical_lossy(path: &Path) -> PathBuf {
    path.canonicalize().unwrap_or_else(|_| {
        match (path.parent().map(Path::canonicalize), path.file_name()) {
            (Some(Ok(parent)), Some(name)) => parent.join(name),
            _ => path.to_path_buf(),
        }
    })
}

fn watch_root_for(path: &Path) -> PathBuf {
    path.parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
