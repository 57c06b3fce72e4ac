//! Content processors.
//!
//! A processor maps one file's raw text to a [`ProcessorResult`]. The
//! signature is infallible: every problem, including a panic inside a
//! third-party parser, comes back as an error variant.

mod html;
mod markdown;
mod template;

use std::panic::{self, AssertUnwindSafe};

pub use html::{EVENT_HANDLER_ATTRIBUTES, HtmlProcessor};
pub use markdown::MarkdownProcessor;
pub use template::TemplateProcessor;

use crate::model::{ContentFormat, ErrorType, ParseErrors, ProcessorResult};

/// Maps raw content text to a validated result.
pub trait Processor: Send + Sync {
    /// Process `raw` content. Never panics and never fails.
    fn process(&self, raw: &str) -> ProcessorResult;
}

/// Run the processor for `format` over `raw`.
#[must_use]
pub fn process(format: ContentFormat, raw: &str) -> ProcessorResult {
    match format {
        ContentFormat::Markdown => MarkdownProcessor::new().process(raw),
        ContentFormat::Html => HtmlProcessor.process(raw),
        ContentFormat::Template => TemplateProcessor.process(raw),
    }
}

/// Run `f`, converting a panic into an `unexpected_error` result.
pub(crate) fn catch_unexpected<F>(raw: &str, f: F) -> ProcessorResult
where
    F: FnOnce() -> ProcessorResult,
{
    panic::catch_unwind(AssertUnwindSafe(f)).unwrap_or_else(|payload| {
        let detail = payload
            .downcast_ref::<&str>()
            .map(|s| (*s).to_owned())
            .or_else(|| payload.downcast_ref::<String>().cloned())
            .unwrap_or_else(|| "unknown panic".to_owned());
        tracing::warn!(%detail, "Processor panicked");
        ProcessorResult::error(
            raw,
            ParseErrors::new(ErrorType::UnexpectedError, format!("unexpected error: {detail}")),
        )
    })
}

/// Convert a byte offset into 1-based `(line, column)`.
///
/// Columns count characters, not bytes. Offsets past the end clamp to the
/// end of the text.
pub(crate) fn line_column(text: &str, offset: usize) -> (usize, usize) {
    let mut offset = offset.min(text.len());
    while !text.is_char_boundary(offset) {
        offset -= 1;
    }
    let before = &text[..offset];
    let line = before.matches('\n').count() + 1;
    let line_start = before.rfind('\n').map_or(0, |i| i + 1);
    let column = before[line_start..].chars().count() + 1;
    (line, column)
}
