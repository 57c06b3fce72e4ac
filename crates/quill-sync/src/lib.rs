//! Content sync for Quill.
//!
//! Keeps a tenant's stored content in step with a directory of content files:
//!
//! - [`discovery`] finds content files that have a metadata sidecar
//! - [`SyncEngine`] processes them and replaces the tenant's content in one
//!   transaction, reporting a [`SyncSummary`]
//! - [`ContentStore`] is the persistence seam, implemented by [`SqliteStore`]
//!   (and `MemoryStore` behind the `mock` feature)
//! - [`Notifier`] receives the summary of every committed sync
//! - [`DirectoryWatcher`] re-syncs after changes settle
//!
//! # Example
//!
//! ```ignore
//! use std::path::Path;
//! use quill_sync::{NoopNotifier, Scope, SqliteStore, SyncEngine};
//!
//! let store = SqliteStore::connect("sqlite://.quill/content.db").await?;
//! let engine = SyncEngine::new(store, NoopNotifier)?;
//! let summary = engine.sync_directory(&Scope::new("acme"), Path::new("content")).await?;
//! println!("{} of {} files ok", summary.successful, summary.total_files);
//! ```

pub mod discovery;
mod engine;
mod fetch;
mod notifier;
mod scope;
mod store;
mod summary;
mod watcher;

pub use engine::{SyncEngine, SyncError};
pub use fetch::{FetchError, RepositoryFetcher};
pub use notifier::{BroadcastNotifier, NoopNotifier, Notifier, SyncNotification};
pub use scope::Scope;
#[cfg(any(test, feature = "mock"))]
pub use store::MemoryStore;
pub use store::{
    ContentRecord, ContentStore, ReplaceOutcome, SqliteStore, StoreError, StoredContent,
};
pub use summary::SyncSummary;
pub use watcher::{
    DEFAULT_DEBOUNCE, DirectoryWatcher, SyncTrigger, WatchConfig, WatchError, WatcherHandle,
};
