//! Template syntax validation.

use minijinja::{Environment, ErrorKind};

use super::{Processor, catch_unexpected, line_column};
use crate::model::{ErrorType, ParseErrors, ProcessorResult};

/// Name under which the template is compiled; shows up in error messages.
const TEMPLATE_NAME: &str = "content.tmpl";

/// Compiles templates to check their syntax.
///
/// Templates are never rendered here, so references to variables, filters or
/// tests that only exist at render time are not errors, and the processed
/// content is always `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TemplateProcessor;

impl TemplateProcessor {
    fn compile(raw: &str) -> ProcessorResult {
        let env = Environment::new();
        let Err(err) = env.template_from_named_str(TEMPLATE_NAME, raw) else {
            return ProcessorResult::success(raw, None);
        };

        let message = err
            .detail()
            .map_or_else(|| err.kind().to_string(), str::to_owned);

        let errors = if err.kind() == ErrorKind::SyntaxError {
            let column = err.range().map(|range| line_column(raw, range.start).1);
            ParseErrors::new(ErrorType::SyntaxError, message).with_position(err.line(), column)
        } else {
            ParseErrors::new(ErrorType::UnexpectedError, message)
        };
        ProcessorResult::error(raw, errors)
    }
}

impl Processor for TemplateProcessor {
    fn process(&self, raw: &str) -> ProcessorResult {
        catch_unexpected(raw, || Self::compile(raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::ParseStatus;

    #[test]
    fn test_valid_template_has_no_processed_content() {
        let result = TemplateProcessor.process("<div>{{ name }}</div>");

        assert_eq!(result.parse_status(), ParseStatus::Success);
        assert!(result.processed_content().is_none());
        assert_eq!(result.raw_content(), "<div>{{ name }}</div>");
    }

    #[test]
    fn test_control_flow_and_unknown_filters_compile() {
        let raw = "{% for post in posts %}\n<h2>{{ post.title | shout }}</h2>\n{% endfor %}";
        let result = TemplateProcessor.process(raw);

        assert_eq!(result.parse_status(), ParseStatus::Success);
    }

    #[test]
    fn test_unclosed_block_is_syntax_error() {
        let result = TemplateProcessor.process("<ul>\n{% for x in items %}\n<li>{{ x }}</li>\n");

        assert_eq!(result.parse_status(), ParseStatus::Error);
        assert!(result.processed_content().is_none());
        let errors = result.parse_errors().unwrap();
        assert_eq!(errors.error_type, ErrorType::SyntaxError);
        assert!(errors.line.is_some());
    }

    #[test]
    fn test_bad_expression_reports_line_and_column() {
        let result = TemplateProcessor.process("ok\n<p>{{ name + }}</p>");
        let errors = result.parse_errors().unwrap();

        assert_eq!(errors.error_type, ErrorType::SyntaxError);
        assert_eq!(errors.line, Some(2));
        assert!(errors.column.is_some());
        assert!(!errors.message.is_empty());
    }

    #[test]
    fn test_plain_text_is_valid() {
        let result = TemplateProcessor.process("just text, no tags");
        assert_eq!(result.parse_status(), ParseStatus::Success);
        assert!(result.processed_content().is_none());
    }
}
