//! In-memory content store for tests.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

use quill_content::ContentAttributes;

use super::{ContentRecord, ContentStore, ReplaceOutcome, StoreError, StoredContent};
use crate::Scope;

#[derive(Debug, Default)]
struct Inner {
    tenants: HashMap<String, Vec<ContentRecord>>,
    next_id: i64,
    fail_next: Option<String>,
    replace_calls: usize,
}

/// Content store that keeps records in memory.
///
/// Enforces the same `(tenant, slug, type)` uniqueness as the SQLite store
/// and can be told to fail the next replace.
///
/// # Example
///
/// ```ignore
/// use quill_sync::{MemoryStore, Scope};
///
/// let store = MemoryStore::new();
/// store.fail_next_replace("disk full");
/// ```
#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next [`replace_all`](ContentStore::replace_all) fail with
    /// [`StoreError::Injected`], leaving stored content untouched.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    pub fn fail_next_replace(&self, message: impl Into<String>) {
        self.inner.write().unwrap().fail_next = Some(message.into());
    }

    /// Number of `replace_all` calls so far, failed ones included.
    ///
    /// # Panics
    ///
    /// Panics if the internal lock is poisoned.
    #[must_use]
    pub fn replace_calls(&self) -> usize {
        self.inner.read().unwrap().replace_calls
    }

    fn replace(
        &self,
        scope: &Scope,
        items: &[ContentAttributes],
    ) -> Result<ReplaceOutcome, StoreError> {
        let mut inner = self.inner.write().unwrap();
        inner.replace_calls += 1;

        if let Some(message) = inner.fail_next.take() {
            return Err(StoreError::Injected(message));
        }

        let mut seen = HashSet::new();
        if let Some(dup) = items
            .iter()
            .find(|item| !seen.insert((item.slug.as_str(), item.content_type)))
        {
            return Err(StoreError::Constraint {
                slug: dup.slug.clone(),
                content_type: dup.content_type,
            });
        }

        let mut records = Vec::with_capacity(items.len());
        let mut stored = Vec::with_capacity(items.len());
        for item in items {
            inner.next_id += 1;
            stored.push(StoredContent {
                id: inner.next_id,
                slug: item.slug.clone(),
                content_type: item.content_type,
                parse_status: item.parse_status,
            });
            records.push(ContentRecord {
                id: inner.next_id,
                attributes: item.clone(),
            });
        }

        let previous = inner.tenants.insert(scope.tenant().to_owned(), records);
        let deleted = previous.map_or(0, |p| p.len() as u64);

        Ok(ReplaceOutcome { deleted, stored })
    }

    fn records(&self, scope: &Scope) -> Vec<ContentRecord> {
        let inner = self.inner.read().unwrap();
        let mut records = inner
            .tenants
            .get(scope.tenant())
            .cloned()
            .unwrap_or_default();
        records.sort_by(|a, b| {
            a.attributes
                .source_path
                .cmp(&b.attributes.source_path)
                .then(a.id.cmp(&b.id))
        });
        records
    }
}

impl ContentStore for MemoryStore {
    async fn replace_all(
        &self,
        scope: &Scope,
        items: &[ContentAttributes],
    ) -> Result<ReplaceOutcome, StoreError> {
        self.replace(scope, items)
    }

    async fn list(&self, scope: &Scope) -> Result<Vec<ContentRecord>, StoreError> {
        Ok(self.records(scope))
    }
}
