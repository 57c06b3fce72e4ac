//! Markdown to HTML conversion.

use pulldown_cmark::{CodeBlockKind, Event, Options, Parser, Tag, html};

use super::{Processor, catch_unexpected, line_column};
use crate::model::{ErrorType, ParseErrors, ProcessorResult};

/// Issue noticed while converting markdown.
struct Diagnostic {
    line: usize,
    message: String,
}

/// Converts markdown to HTML with GitHub-flavored extensions.
///
/// CommonMark accepts any input, so the only failures are diagnostics raised
/// while walking the event stream (currently: a fenced code block that is
/// never closed, which silently swallows the rest of the document). The first
/// diagnostic is reported with its line.
pub struct MarkdownProcessor {
    options: Options,
}

impl MarkdownProcessor {
    /// Processor with tables, strikethrough, task lists and GFM enabled.
    #[must_use]
    pub fn new() -> Self {
        Self {
            options: Options::ENABLE_TABLES
                | Options::ENABLE_STRIKETHROUGH
                | Options::ENABLE_TASKLISTS
                | Options::ENABLE_GFM,
        }
    }

    fn convert(&self, raw: &str) -> ProcessorResult {
        let mut diagnostics = Vec::new();

        let events: Vec<Event<'_>> = Parser::new_ext(raw, self.options)
            .into_offset_iter()
            .map(|(event, range)| {
                if let Event::Start(Tag::CodeBlock(CodeBlockKind::Fenced(_))) = &event
                    && !fence_closed(&raw[range.clone()])
                {
                    let (line, _) = line_column(raw, range.start);
                    diagnostics.push(Diagnostic {
                        line,
                        message: "fenced code block is never closed".to_owned(),
                    });
                }
                event
            })
            .collect();

        if let Some(first) = diagnostics.into_iter().next() {
            return ProcessorResult::error(
                raw,
                ParseErrors::new(ErrorType::SyntaxError, first.message)
                    .with_position(Some(first.line), None),
            );
        }

        let mut output = String::with_capacity(raw.len() * 3 / 2);
        html::push_html(&mut output, events.into_iter());
        ProcessorResult::success(raw, Some(output))
    }
}

impl Default for MarkdownProcessor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor for MarkdownProcessor {
    fn process(&self, raw: &str) -> ProcessorResult {
        catch_unexpected(raw, || self.convert(raw))
    }
}

/// Check whether a fenced code block's source ends with a closing fence.
///
/// `block` spans from the opening fence to the end of the block. Container
/// prefixes (`>` and indentation) are ignored on each line.
fn fence_closed(block: &str) -> bool {
    let strip = |line: &str| {
        line.trim_start_matches(|c: char| c == '>' || c.is_whitespace())
            .trim_end()
            .to_owned()
    };

    let lines: Vec<String> = block.trim_end().lines().map(strip).collect();
    let Some(opening) = lines.first() else {
        return false;
    };
    let Some(fence_char) = opening.chars().next().filter(|c| *c == '`' || *c == '~') else {
        // Not a fence we recognize; don't report
        return true;
    };
    let fence_len = opening.chars().take_while(|c| *c == fence_char).count();

    if lines.len() < 2 {
        return false;
    }
    lines.last().is_some_and(|closing| {
        closing.chars().all(|c| c == fence_char) && closing.chars().count() >= fence_len
    })
}
