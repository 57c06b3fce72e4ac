//! Content file discovery.
//!
//! A content file is eligible when it sits directly in the content directory,
//! has one of the supported extensions and is accompanied by a sidecar with
//! the same stem and a `.yaml` extension.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use glob::Pattern;
use quill_content::ContentFormat;

/// Extension of the metadata sidecar.
pub const SIDECAR_EXTENSION: &str = "yaml";

/// Sidecar path for a content file: `post.md` -> `post.yaml`.
#[must_use]
pub fn sidecar_path(path: &Path) -> PathBuf {
    path.with_extension(SIDECAR_EXTENSION)
}

/// Find eligible content files directly inside `directory`.
///
/// Subdirectories are not descended into. Files without a sidecar are
/// skipped. The result is sorted and free of duplicates.
#[must_use]
pub fn discover(directory: &Path) -> Vec<PathBuf> {
    let base = Pattern::escape(&directory.to_string_lossy());
    let mut found = BTreeSet::new();

    for format in ContentFormat::ALL {
        let pattern = format!("{base}/*.{}", format.extension());
        let entries = match glob::glob(&pattern) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::warn!(pattern = %pattern, error = %e, "Invalid discovery pattern");
                continue;
            }
        };

        for entry in entries {
            match entry {
                Ok(path) if path.is_file() => {
                    if sidecar_path(&path).is_file() {
                        found.insert(path);
                    } else {
                        tracing::debug!(path = %path.display(), "Skipping content file without sidecar");
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    tracing::debug!(path = %e.path().display(), error = %e.error(), "Skipping unreadable entry");
                }
            }
        }
    }

    found.into_iter().collect()
}
