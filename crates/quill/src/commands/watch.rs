//! `quill watch` command implementation.

use std::sync::Arc;

use clap::Args;
use quill_sync::{BroadcastNotifier, DirectoryWatcher, WatchConfig};
use tokio::sync::broadcast::error::RecvError;

use super::{CommonArgs, open_engine};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the watch command.
#[derive(Args)]
pub(crate) struct WatchArgs {
    #[command(flatten)]
    pub common: CommonArgs,

    /// Quiet period in milliseconds before a change triggers a sync
    /// (overrides config).
    #[arg(long)]
    debounce_ms: Option<u64>,
}

impl WatchArgs {
    /// Sync once, then re-sync after every burst of changes until Ctrl-C.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config(self.debounce_ms)?;
        let notifier = BroadcastNotifier::default();
        let mut notifications = notifier.subscribe();
        let (scope, engine) = open_engine(&config, notifier).await?;
        let source_dir = config.content_resolved.source_dir.clone();

        output.info(&format!(
            "Initial sync of {} for tenant {scope}",
            source_dir.display()
        ));
        engine.sync_directory(&scope, &source_dir).await?;

        let watch_config = WatchConfig::new(&source_dir).with_debounce(config.watch.debounce());
        let handle = DirectoryWatcher::start(watch_config, scope, Arc::new(engine))?;
        output.highlight(&format!(
            "Watching {} (debounce {} ms). Press Ctrl-C to stop.",
            source_dir.display(),
            config.watch.debounce_ms
        ));

        loop {
            tokio::select! {
                signal = tokio::signal::ctrl_c() => {
                    if let Err(e) = signal {
                        output.error(&format!("Cannot listen for Ctrl-C: {e}"));
                    }
                    break;
                }
                received = notifications.recv() => match received {
                    Ok(notification) => output.summary(&notification.summary),
                    Err(RecvError::Lagged(missed)) => {
                        output.warning(&format!("Missed {missed} sync summaries"));
                    }
                    Err(RecvError::Closed) => break,
                },
            }
        }

        output.info("Stopping watcher");
        handle.shutdown().await;
        Ok(())
    }
}
