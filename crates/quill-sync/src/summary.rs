//! Per-sync counts reported to callers and subscribers.

use std::collections::BTreeMap;
use std::time::Duration;

use quill_content::{ContentAttributes, ContentType, ParseStatus};
use serde::Serialize;

/// Outcome of one committed sync run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SyncSummary {
    /// Number of discovered files, including those that failed validation.
    pub total_files: usize,
    pub successful: usize,
    pub errors: usize,
    pub duration_ms: u64,
    /// Successful items per content type. Types with no successes are absent.
    pub content_types: BTreeMap<ContentType, usize>,
}

impl SyncSummary {
    /// Summarize the records of a run.
    #[must_use]
    pub fn from_records(records: &[ContentAttributes], elapsed: Duration) -> Self {
        let mut content_types = BTreeMap::new();
        let mut successful = 0;

        for record in records {
            if record.parse_status == ParseStatus::Success {
                successful += 1;
                *content_types.entry(record.content_type).or_insert(0) += 1;
            }
        }

        Self {
            total_files: records.len(),
            successful,
            errors: records.len() - successful,
            duration_ms: u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX),
            content_types,
        }
    }
}
