//! CLI command implementations.

pub(crate) mod sync;
pub(crate) mod watch;

use std::path::{Path, PathBuf};

use clap::Args;
use quill_config::{CliSettings, Config};
use quill_sync::{Notifier, Scope, SqliteStore, SyncEngine};

use crate::error::CliError;

pub(crate) use sync::SyncArgs;
pub(crate) use watch::WatchArgs;

/// Options shared by every command.
#[derive(Args)]
pub(crate) struct CommonArgs {
    /// Path to configuration file (default: auto-discover quill.toml).
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Content source directory (overrides config).
    #[arg(short, long)]
    source_dir: Option<PathBuf>,

    /// Tenant to sync content for (overrides config).
    #[arg(short, long, env = "QUILL_TENANT")]
    tenant: Option<String>,

    /// SQLite database URL (overrides config).
    #[arg(long)]
    database_url: Option<String>,

    /// Number of processing workers (overrides config).
    #[arg(long)]
    workers: Option<usize>,

    /// Enable verbose output (per-file errors and timing logs).
    #[arg(short, long)]
    pub verbose: bool,
}

impl CommonArgs {
    /// Load configuration with these arguments applied on top.
    fn load_config(&self, debounce_ms: Option<u64>) -> Result<Config, CliError> {
        let cli_settings = CliSettings {
            source_dir: self.source_dir.clone(),
            tenant: self.tenant.clone(),
            database_url: self.database_url.clone(),
            workers: self.workers,
            debounce_ms,
        };
        let config = Config::load(self.config.as_deref(), Some(&cli_settings))?;
        tracing::debug!(
            config_path = ?config.config_path,
            source_dir = %config.content_resolved.source_dir.display(),
            "Configuration loaded"
        );
        Ok(config)
    }
}

/// Open the store and build an engine for `config`.
async fn open_engine<N: Notifier>(
    config: &Config,
    notifier: N,
) -> Result<(Scope, SyncEngine<SqliteStore, N>), CliError> {
    let scope = Scope::new(config.require_tenant()?);
    ensure_project_dir(&config.content_resolved.project_dir)?;

    let store = SqliteStore::connect(&config.store_resolved.database_url).await?;
    let engine = SyncEngine::with_workers(store, notifier, config.sync.workers.unwrap_or(0))?;
    Ok((scope, engine))
}

/// Ensure the `.quill/` project directory exists with a `.gitignore`.
fn ensure_project_dir(project_dir: &Path) -> Result<(), CliError> {
    std::fs::create_dir_all(project_dir)?;

    let gitignore_path = project_dir.join(".gitignore");
    if !gitignore_path.exists() {
        let _ = std::fs::write(&gitignore_path, "# Automatically created by quill\n*\n");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ensure_project_dir_writes_gitignore_once() {
        let dir = tempfile::TempDir::new().unwrap();
        let project = dir.path().join(".quill");

        ensure_project_dir(&project).unwrap();
        std::fs::write(project.join(".gitignore"), "custom\n").unwrap();
        ensure_project_dir(&project).unwrap();

        assert_eq!(
            std::fs::read_to_string(project.join(".gitignore")).unwrap(),
            "custom\n"
        );
    }
}
