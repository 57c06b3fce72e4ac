//! Content model and processors for Quill.
//!
//! This crate holds everything that turns one content file into a storable
//! record, without touching the store:
//!
//! - [`metadata`] parses the `name.yaml` sidecar that accompanies each content file
//! - [`processor`] validates and transforms markdown, HTML and template content
//! - [`ContentAttributes`] merges both into the record the sync engine persists
//!
//! Processors never return errors. Problems are reported as data inside
//! [`ProcessorResult::Error`] so that a single malformed file cannot abort a
//! whole sync.
//!
//! # Example
//!
//! ```ignore
//! use quill_content::{ContentFormat, processor};
//!
//! let result = processor::process(ContentFormat::Html, "<p onclick=\"x()\">Hi</p>");
//! assert!(result.parse_errors().is_some());
//! ```

pub mod metadata;
mod model;
pub mod processor;

pub use metadata::{ContentMetadata, MetadataError};
pub use model::{
    ContentAttributes, ContentFormat, ContentType, ErrorType, ParseErrors, ParseStatus,
    ProcessorResult, Violation, ViolationType,
};
pub use processor::Processor;
