//! Remote content repositories.
//!
//! Fetching content from a hosted repository is delegated to an implementor
//! of [`RepositoryFetcher`]; the engine only needs a local checkout to sync
//! from. See [`SyncEngine::sync_repository`](crate::SyncEngine::sync_repository).

use std::future::Future;
use std::path::PathBuf;

use crate::Scope;

/// Why a repository could not be fetched.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("project not found: {0}")]
    ProjectNotFound(String),
    #[error("project {0} has no content repository configured")]
    NoContentRepo(String),
    #[error("repository provider is not connected")]
    NotConnected,
    #[error("unsupported repository provider: {0}")]
    UnsupportedProvider(String),
    #[error("invalid repository URL: {0}")]
    InvalidUrl(String),
}

/// Produces a local checkout of a scope's content repository.
pub trait RepositoryFetcher: Send + Sync {
    /// Clone the repository into a temporary directory and return its path.
    ///
    /// The caller owns the directory and removes it when done.
    fn clone_to_temp(
        &self,
        scope: &Scope,
    ) -> impl Future<Output = Result<PathBuf, FetchError>> + Send;
}
