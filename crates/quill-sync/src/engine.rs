//! Full-replace directory sync.
//!
//! One run validates its inputs, discovers eligible files, processes every
//! file independently on a bounded worker pool and then replaces the
//! tenant's stored content with the results in a single transaction.
//! A malformed file becomes an error record; it never aborts the run.

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use quill_content::{
    ContentAttributes, ContentFormat, ErrorType, ParseErrors, ParseStatus, metadata, processor,
};
use rayon::ThreadPool;
use rayon::prelude::*;
use uuid::Uuid;

use crate::discovery::{discover, sidecar_path};
use crate::fetch::{FetchError, RepositoryFetcher};
use crate::notifier::{NoopNotifier, Notifier};
use crate::store::{ContentStore, StoreError};
use crate::watcher::SyncTrigger;
use crate::{Scope, SyncSummary};

/// Characters of content included in error log lines.
const PREVIEW_CHARS: usize = 120;

/// Errors that abort a sync run.
///
/// Problems with individual files are not errors at this level; they are
/// recorded on the file's [`ContentAttributes`].
#[derive(Debug, thiserror::Error)]
pub enum SyncError {
    #[error("content directory is missing or unreadable: {}", .0.display())]
    InvalidDirectory(PathBuf),
    #[error("sync requires a tenant")]
    MissingTenant,
    #[error("persisting content failed, previous content kept: {0}")]
    Persistence(#[from] StoreError),
    #[error("content worker failed: {0}")]
    Worker(String),
    #[error(transparent)]
    Fetch(#[from] FetchError),
}

/// Syncs content directories into a [`ContentStore`].
pub struct SyncEngine<S, N = NoopNotifier> {
    store: S,
    notifier: N,
    pool: Arc<ThreadPool>,
}

impl<S: ContentStore, N: Notifier> SyncEngine<S, N> {
    /// Engine with one worker per available CPU.
    pub fn new(store: S, notifier: N) -> Result<Self, SyncError> {
        Self::with_workers(store, notifier, 0)
    }

    /// Engine with a fixed number of processing workers; `0` picks the
    /// available parallelism.
    pub fn with_workers(store: S, notifier: N, workers: usize) -> Result<Self, SyncError> {
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(workers)
            .thread_name(|i| format!("quill-sync-{i}"))
            .build()
            .map_err(|e| SyncError::Worker(e.to_string()))?;

        Ok(Self {
            store,
            notifier,
            pool: Arc::new(pool),
        })
    }

    #[must_use]
    pub fn store(&self) -> &S {
        &self.store
    }

    #[must_use]
    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Replace `scope`'s stored content with the content of `directory`.
    ///
    /// Fails without touching the store if the tenant is blank or the
    /// directory cannot be read. If persisting fails the transaction is
    /// rolled back and the tenant keeps its previous content.
    pub async fn sync_directory(
        &self,
        scope: &Scope,
        directory: &Path,
    ) -> Result<SyncSummary, SyncError> {
        let start = Instant::now();
        validate(scope, directory)?;

        let files = discover(directory);
        tracing::debug!(
            tenant = %scope.tenant(),
            dir = %directory.display(),
            files = files.len(),
            "Discovered content files"
        );

        let records = self.process_all(files).await?;

        let outcome = match self.store.replace_all(scope, &records).await {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(tenant = %scope.tenant(), error = %err, "Content sync rolled back");
                return Err(SyncError::Persistence(err));
            }
        };

        let summary = SyncSummary::from_records(&records, start.elapsed());
        log_error_records(&records);
        self.notifier.publish(&scope.topic(), &summary);

        tracing::info!(
            tenant = %scope.tenant(),
            total_files = summary.total_files,
            successful = summary.successful,
            errors = summary.errors,
            replaced = outcome.deleted,
            elapsed_ms = summary.duration_ms,
            "Content sync completed"
        );

        Ok(summary)
    }

    /// Fetch `scope`'s content repository and sync the checkout.
    ///
    /// The temporary checkout is removed afterwards, whether or not the sync
    /// succeeded.
    pub async fn sync_repository<F: RepositoryFetcher>(
        &self,
        fetcher: &F,
        scope: &Scope,
    ) -> Result<SyncSummary, SyncError> {
        let checkout = fetcher.clone_to_temp(scope).await?;
        let result = self.sync_directory(scope, &checkout).await;

        if let Err(e) = tokio::fs::remove_dir_all(&checkout).await {
            tracing::warn!(
                path = %checkout.display(),
                error = %e,
                "Failed to remove repository checkout"
            );
        }
        result
    }

    async fn process_all(&self, files: Vec<PathBuf>) -> Result<Vec<ContentAttributes>, SyncError> {
        let pool = Arc::clone(&self.pool);
        let files: Vec<(PathBuf, ContentFormat)> = files
            .into_iter()
            .filter_map(|path| ContentFormat::from_path(&path).map(|format| (path, format)))
            .collect();

        tokio::task::spawn_blocking(move || {
            pool.install(|| {
                files
                    .par_iter()
                    .map(|(path, format)| process_file(path, *format))
                    .collect()
            })
        })
        .await
        .map_err(|e| SyncError::Worker(e.to_string()))
    }
}

impl<S: ContentStore, N: Notifier> SyncTrigger for SyncEngine<S, N> {
    fn sync(
        &self,
        scope: &Scope,
        directory: &Path,
    ) -> impl Future<Output = Result<SyncSummary, SyncError>> + Send {
        self.sync_directory(scope, directory)
    }
}

fn validate(scope: &Scope, directory: &Path) -> Result<(), SyncError> {
    if !scope.has_tenant() {
        return Err(SyncError::MissingTenant);
    }
    if !directory.is_dir() || fs::read_dir(directory).is_err() {
        return Err(SyncError::InvalidDirectory(directory.to_path_buf()));
    }
    Ok(())
}

/// Build the record for one content file. Never fails.
fn process_file(path: &Path, format: ContentFormat) -> ContentAttributes {
    let source_path = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = path
        .file_stem()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();

    let raw = match fs::read(path) {
        Ok(bytes) => String::from_utf8_lossy(&bytes).into_owned(),
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Cannot read content file");
            let errors = ParseErrors::new(
                ErrorType::ReadError,
                format!("cannot read {source_path}: {e}"),
            );
            return ContentAttributes::placeholder(
                placeholder_slug(&stem),
                stem,
                format,
                source_path,
                "",
                errors,
            );
        }
    };

    match metadata::parse(&sidecar_path(path)) {
        Ok(meta) => {
            let result = processor::process(format, &raw);
            ContentAttributes::from_processed(meta, format, source_path, result)
        }
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "Invalid sidecar metadata");
            ContentAttributes::placeholder(
                placeholder_slug(&stem),
                stem,
                format,
                source_path,
                raw,
                err.to_parse_errors(),
            )
        }
    }
}

/// Unique slug for a file whose metadata is unusable: `{stem}-invalid-{8 hex}`.
fn placeholder_slug(stem: &str) -> String {
    let id = Uuid::new_v4().simple().to_string();
    format!("{stem}-invalid-{}", &id[..8])
}

fn log_error_records(records: &[ContentAttributes]) {
    for record in records
        .iter()
        .filter(|r| r.parse_status == ParseStatus::Error)
    {
        let (error_type, message) = record
            .parse_errors
            .as_ref()
            .map_or((None, ""), |e| (Some(e.error_type), e.message.as_str()));

        tracing::warn!(
            file = %record.source_path,
            slug = %record.slug,
            error_type = ?error_type,
            message = %message,
            preview = %preview(&record.raw_content),
            "Content file has errors"
        );
    }
}

/// First [`PREVIEW_CHARS`] characters of `text` on one line.
fn preview(text: &str) -> String {
    let mut out: String = text
        .chars()
        .take(PREVIEW_CHARS)
        .map(|c| if c.is_control() { ' ' } else { c })
        .collect();
    if text.chars().nth(PREVIEW_CHARS).is_some() {
        out.push_str("...");
    }
    out
}
