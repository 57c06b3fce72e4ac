//! `quill sync` command implementation.

use clap::Args;
use quill_sync::NoopNotifier;

use super::{CommonArgs, open_engine};
use crate::error::CliError;
use crate::output::Output;

/// Arguments for the sync command.
#[derive(Args)]
pub(crate) struct SyncArgs {
    #[command(flatten)]
    pub common: CommonArgs,
}

impl SyncArgs {
    /// Run one full sync of the content directory.
    pub(crate) async fn execute(self) -> Result<(), CliError> {
        let output = Output::new();
        let config = self.common.load_config(None)?;
        let (scope, engine) = open_engine(&config, NoopNotifier).await?;
        let source_dir = &config.content_resolved.source_dir;

        output.info(&format!(
            "Syncing {} for tenant {scope}",
            source_dir.display()
        ));
        let summary = engine.sync_directory(&scope, source_dir).await?;
        output.summary(&summary);

        Ok(())
    }
}
