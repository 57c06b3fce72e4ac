//! Debounce state machine and event loop of a directory watcher.
//!
//! The watcher is Idle until a relevant change arrives, then Pending while a
//! timer runs. Every further relevant change restarts the timer. When the
//! timer fires the watcher returns to Idle and runs one sync. Timers are
//! tagged with a generation so that a fire from a timer that has since been
//! replaced is ignored.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use notify::EventKind;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;

use super::SyncTrigger;
use crate::Scope;

/// Whether a change kind can affect the synced content.
pub(crate) fn is_relevant(kind: &EventKind) -> bool {
    matches!(
        kind,
        EventKind::Create(_) | EventKind::Modify(_) | EventKind::Remove(_)
    )
}

pub(crate) struct WatcherState<T> {
    scope: Scope,
    directory: PathBuf,
    debounce: Duration,
    trigger: Arc<T>,
    timer: Option<JoinHandle<()>>,
    generation: u64,
    fires: mpsc::UnboundedSender<u64>,
}

impl<T: SyncTrigger> WatcherState<T> {
    pub(crate) fn new(
        scope: Scope,
        directory: PathBuf,
        debounce: Duration,
        trigger: Arc<T>,
        fires: mpsc::UnboundedSender<u64>,
    ) -> Self {
        Self {
            scope,
            directory,
            debounce,
            trigger,
            timer: None,
            generation: 0,
            fires,
        }
    }

    /// True while a debounce timer is armed.
    pub(crate) fn is_pending(&self) -> bool {
        self.timer.is_some()
    }

    /// Handle one batch of change kinds. Returns true if the timer was
    /// (re)armed.
    pub(crate) fn record(&mut self, kinds: &[EventKind]) -> bool {
        if !kinds.iter().any(is_relevant) {
            return false;
        }
        self.arm();
        true
    }

    fn arm(&mut self) {
        self.cancel();
        self.generation += 1;

        let generation = self.generation;
        let delay = self.debounce;
        let fires = self.fires.clone();
        self.timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = fires.send(generation);
        }));
    }

    fn cancel(&mut self) {
        if let Some(timer) = self.timer.take() {
            timer.abort();
        }
    }

    /// Accept a timer fire. Returns true, leaving the state Idle, only for
    /// the currently armed timer.
    pub(crate) fn take_fire(&mut self, generation: u64) -> bool {
        if self.timer.is_none() || generation != self.generation {
            return false;
        }
        self.timer = None;
        true
    }

    /// Run one sync and log how it went. Failures are not retried.
    pub(crate) async fn fire(&self) {
        tracing::debug!(dir = %self.directory.display(), "Debounce elapsed, syncing");

        match self.trigger.sync(&self.scope, &self.directory).await {
            Ok(summary) => tracing::info!(
                tenant = %self.scope.tenant(),
                total_files = summary.total_files,
                successful = summary.successful,
                errors = summary.errors,
                elapsed_ms = summary.duration_ms,
                "Watched directory synced"
            ),
            Err(e) => tracing::warn!(
                tenant = %self.scope.tenant(),
                error = %e,
                "Watched directory sync failed"
            ),
        }
    }

    pub(crate) fn shutdown(&mut self) {
        self.cancel();
    }
}

/// Process change batches, timer fires and shutdown one at a time until
/// shutdown is requested or the change stream ends.
pub(crate) async fn run<T: SyncTrigger>(
    mut state: WatcherState<T>,
    mut events: mpsc::Receiver<Vec<EventKind>>,
    mut fires: mpsc::UnboundedReceiver<u64>,
    mut shutdown: oneshot::Receiver<()>,
) {
    loop {
        tokio::select! {
            biased;
            _ = &mut shutdown => break,
            batch = events.recv() => {
                let Some(kinds) = batch else { break };
                if state.record(&kinds) {
                    tracing::debug!(events = kinds.len(), "Change recorded, debounce restarted");
                }
            }
            Some(generation) = fires.recv() => {
                if state.take_fire(generation) {
                    state.fire().await;
                }
            }
        }
    }

    state.shutdown();
    tracing::info!(dir = %state.directory.display(), "Directory watcher stopped");
}

#[cfg(test)]
mod tests {
    use std::path::Path;

    use notify::event::{AccessKind, CreateKind, ModifyKind, RemoveKind};

    use super::*;
    use crate::{SyncError, SyncSummary};

    struct NeverCalled;

    impl SyncTrigger for NeverCalled {
        async fn sync(&self, _scope: &Scope, _dir: &Path) -> Result<SyncSummary, SyncError> {
            Err(SyncError::MissingTenant)
        }
    }

    fn state() -> (WatcherState<NeverCalled>, mpsc::UnboundedReceiver<u64>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let state = WatcherState::new(
            Scope::new("acme"),
            PathBuf::from("content"),
            Duration::from_secs(60),
            Arc::new(NeverCalled),
            tx,
        );
        (state, rx)
    }

    #[test]
    fn test_relevant_kinds() {
        assert!(is_relevant(&EventKind::Create(CreateKind::File)));
        assert!(is_relevant(&EventKind::Modify(ModifyKind::Any)));
        assert!(is_relevant(&EventKind::Remove(RemoveKind::File)));
        assert!(!is_relevant(&EventKind::Access(AccessKind::Any)));
        assert!(!is_relevant(&EventKind::Any));
        assert!(!is_relevant(&EventKind::Other));
    }

    #[tokio::test]
    async fn test_irrelevant_batches_stay_idle() {
        let (mut state, _rx) = state();

        assert!(!state.record(&[]));
        assert!(!state.record(&[EventKind::Access(AccessKind::Any), EventKind::Other]));
        assert!(!state.is_pending());
    }

    #[tokio::test]
    async fn test_mixed_batch_arms_timer() {
        let (mut state, _rx) = state();

        assert!(state.record(&[EventKind::Other, EventKind::Create(CreateKind::File)]));
        assert!(state.is_pending());
    }

    #[tokio::test]
    async fn test_rearm_makes_previous_fire_stale() {
        let (mut state, _rx) = state();

        state.record(&[EventKind::Modify(ModifyKind::Any)]);
        let first = state.generation;
        state.record(&[EventKind::Modify(ModifyKind::Any)]);

        assert!(!state.take_fire(first));
        assert!(state.is_pending());
        assert!(state.take_fire(state.generation));
        assert!(!state.is_pending());
        assert!(!state.take_fire(state.generation));
    }

    #[tokio::test]
    async fn test_shutdown_cancels_timer() {
        let (mut state, _rx) = state();

        state.record(&[EventKind::Remove(RemoveKind::Any)]);
        state.shutdown();

        assert!(!state.is_pending());
    }
}
