//! Content persistence.
//!
//! The sync engine only needs one write operation: replace everything a
//! tenant owns with a new set of records, atomically. [`ContentStore`]
//! captures that contract; [`SqliteStore`] implements it on `sqlx`.

#[cfg(any(test, feature = "mock"))]
mod memory;
mod sqlite;

use std::future::Future;

use quill_content::{ContentAttributes, ContentType, ParseStatus};

use crate::Scope;

#[cfg(any(test, feature = "mock"))]
pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

/// Store operation errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("failed to encode content: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("cannot create database directory: {0}")]
    Io(#[from] std::io::Error),
    #[error("duplicate content: slug '{slug}' with type {content_type}")]
    Constraint {
        slug: String,
        content_type: ContentType,
    },
    #[error("invalid stored row: {0}")]
    Decode(String),
    #[error("injected failure: {0}")]
    Injected(String),
}

/// Identity of a row written by [`ContentStore::replace_all`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredContent {
    pub id: i64,
    pub slug: String,
    pub content_type: ContentType,
    pub parse_status: ParseStatus,
}

/// A stored record with its row id.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentRecord {
    pub id: i64,
    pub attributes: ContentAttributes,
}

/// Result of a committed replace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReplaceOutcome {
    /// Rows removed for the tenant before inserting.
    pub deleted: u64,
    /// Rows inserted, ordered by id.
    pub stored: Vec<StoredContent>,
}

/// Transactional content storage partitioned by tenant.
pub trait ContentStore: Send + Sync + 'static {
    /// Delete all content of `scope`'s tenant and insert `items`, as one
    /// transaction.
    ///
    /// On error nothing is changed: the tenant keeps exactly the content it
    /// had before the call.
    fn replace_all(
        &self,
        scope: &Scope,
        items: &[ContentAttributes],
    ) -> impl Future<Output = Result<ReplaceOutcome, StoreError>> + Send;

    /// All content of `scope`'s tenant, ordered by source path.
    fn list(
        &self,
        scope: &Scope,
    ) -> impl Future<Output = Result<Vec<ContentRecord>, StoreError>> + Send;
}
