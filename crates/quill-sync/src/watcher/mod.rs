//! Debounced directory watching.
//!
//! [`DirectoryWatcher`] subscribes to filesystem changes in a content
//! directory and runs a sync once changes have settled for the configured
//! debounce duration. A burst of saves produces a single sync.
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use quill_sync::{DirectoryWatcher, Scope, WatchConfig};
//!
//! let handle = DirectoryWatcher::start(
//!     WatchConfig::new("content"),
//!     Scope::new("acme"),
//!     Arc::new(engine),
//! )?;
//! // ...
//! handle.shutdown().await;
//! ```

mod state;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use notify::{Event, EventKind, RecommendedWatcher, RecursiveMode, Watcher};
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use crate::{Scope, SyncError, SyncSummary};
use state::WatcherState;

/// Debounce used when none is configured.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(1000);

/// Capacity of the change-event channel between `notify` and the event loop.
const EVENT_BUFFER: usize = 100;

/// Runs a sync on behalf of a watcher.
pub trait SyncTrigger: Send + Sync + 'static {
    fn sync(
        &self,
        scope: &Scope,
        directory: &Path,
    ) -> impl Future<Output = Result<SyncSummary, SyncError>> + Send;
}

/// Errors starting a watcher.
#[derive(Debug, thiserror::Error)]
pub enum WatchError {
    #[error("cannot watch {}: not a directory", .0.display())]
    InvalidDirectory(PathBuf),
    #[error("debounce duration must be greater than zero")]
    ZeroDebounce,
    #[error("file watcher error: {0}")]
    Notify(#[from] notify::Error),
}

/// What to watch and how long to wait for changes to settle.
#[derive(Debug, Clone)]
pub struct WatchConfig {
    pub directory: PathBuf,
    pub debounce: Duration,
}

impl WatchConfig {
    #[must_use]
    pub fn new(directory: impl Into<PathBuf>) -> Self {
        Self {
            directory: directory.into(),
            debounce: DEFAULT_DEBOUNCE,
        }
    }

    #[must_use]
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }
}

/// Starts directory watchers.
pub struct DirectoryWatcher;

impl DirectoryWatcher {
    /// Watch `config.directory` (non-recursively) and sync `scope` through
    /// `trigger` after each burst of changes.
    ///
    /// Must be called from within a tokio runtime. The watcher runs until the
    /// returned handle is shut down or dropped.
    pub fn start<T: SyncTrigger>(
        config: WatchConfig,
        scope: Scope,
        trigger: Arc<T>,
    ) -> Result<WatcherHandle, WatchError> {
        if !config.directory.is_dir() {
            return Err(WatchError::InvalidDirectory(config.directory));
        }
        if config.debounce.is_zero() {
            return Err(WatchError::ZeroDebounce);
        }

        let (tx, rx) = mpsc::channel::<Vec<EventKind>>(EVENT_BUFFER);
        let mut watcher =
            notify::recommended_watcher(move |res: Result<Event, notify::Error>| match res {
                Ok(event) => {
                    // Callback runs on notify's own thread
                    let _ = tx.blocking_send(vec![event.kind]);
                }
                Err(e) => tracing::warn!(error = %e, "File watcher error"),
            })?;
        watcher.watch(&config.directory, RecursiveMode::NonRecursive)?;

        tracing::info!(
            dir = %config.directory.display(),
            debounce_ms = u64::try_from(config.debounce.as_millis()).unwrap_or(u64::MAX),
            tenant = %scope.tenant(),
            "Watching content directory"
        );

        let mut handle = spawn_loop(config, scope, trigger, rx);
        handle.watcher = Some(watcher);
        Ok(handle)
    }
}

/// Spawn the event loop fed by `events`.
fn spawn_loop<T: SyncTrigger>(
    config: WatchConfig,
    scope: Scope,
    trigger: Arc<T>,
    events: mpsc::Receiver<Vec<EventKind>>,
) -> WatcherHandle {
    let (fire_tx, fire_rx) = mpsc::unbounded_channel();
    let (shutdown_tx, shutdown_rx) = oneshot::channel();

    let state = WatcherState::new(scope, config.directory, config.debounce, trigger, fire_tx);
    let task = tokio::spawn(state::run(state, events, fire_rx, shutdown_rx));

    WatcherHandle {
        shutdown: Some(shutdown_tx),
        task: Some(task),
        watcher: None,
    }
}

/// Running watcher. Dropping it stops the watcher without waiting.
#[derive(Debug)]
pub struct WatcherHandle {
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<()>>,
    watcher: Option<RecommendedWatcher>,
}

impl WatcherHandle {
    /// Stop watching and wait for the event loop to exit.
    ///
    /// A pending debounce timer is cancelled without syncing; a sync already
    /// in progress completes first.
    pub async fn shutdown(mut self) {
        self.watcher.take();
        if let Some(tx) = self.shutdown.take() {
            let _ = tx.send(());
        }
        if let Some(task) = self.task.take()
            && let Err(e) = task.await
        {
            tracing::warn!(error = %e, "Watcher task ended abnormally");
        }
    }
}
