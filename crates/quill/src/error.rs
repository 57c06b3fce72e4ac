//! CLI error types.

use quill_config::ConfigError;
use quill_sync::{StoreError, SyncError, WatchError};

/// CLI error type.
#[derive(Debug, thiserror::Error)]
pub(crate) enum CliError {
    #[error("{0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Store(#[from] StoreError),

    #[error("{0}")]
    Sync(#[from] SyncError),

    #[error("{0}")]
    Watch(#[from] WatchError),
}
