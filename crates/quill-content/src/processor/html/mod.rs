//! HTML validation and active-content detection.

mod tree;

use super::{Processor, catch_unexpected, line_column};
use crate::model::{ErrorType, ParseErrors, ProcessorResult, Violation, ViolationType};
use tree::Element;

/// Inline event-handler attributes treated as active content.
pub const EVENT_HANDLER_ATTRIBUTES: &[&str] = &[
    "onabort",
    "onafterprint",
    "onbeforeprint",
    "onbeforeunload",
    "onblur",
    "onchange",
    "onclick",
    "oncontextmenu",
    "oncopy",
    "oncut",
    "ondblclick",
    "ondrag",
    "ondragend",
    "ondragstart",
    "ondrop",
    "onerror",
    "onfocus",
    "onhashchange",
    "oninput",
    "oninvalid",
    "onkeydown",
    "onkeypress",
    "onkeyup",
    "onload",
    "onmousedown",
    "onmouseenter",
    "onmouseleave",
    "onmousemove",
    "onmouseout",
    "onmouseover",
    "onmouseup",
    "onpaste",
    "onreset",
    "onresize",
    "onscroll",
    "onselect",
    "onsubmit",
    "ontoggle",
    "onunload",
    "onwheel",
];

/// Attributes whose values are checked for the `javascript:` scheme.
const URL_ATTRIBUTES: &[&str] = &["href", "src"];

/// Validates HTML and flags active content.
///
/// Detection only: a clean document is passed through byte-for-byte and a
/// flagged one is never rewritten. The `javascript:` check is a literal,
/// case-insensitive prefix match on the trimmed attribute value; entity- or
/// percent-encoded variants are not decoded.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtmlProcessor;

impl HtmlProcessor {
    fn validate(raw: &str) -> ProcessorResult {
        let roots = match tree::parse(raw) {
            Ok(roots) => roots,
            Err(err) => {
                let (line, column) = line_column(raw, err.offset);
                return ProcessorResult::error(
                    raw,
                    ParseErrors::new(
                        ErrorType::SyntaxError,
                        format!("HTML parse error: {}", err.message),
                    )
                    .with_position(Some(line), Some(column)),
                );
            }
        };

        let violations = scan(&roots);
        if violations.is_empty() {
            return ProcessorResult::success(raw, Some(raw.to_owned()));
        }

        let message = format!(
            "found {} disallowed active content item(s)",
            violations.len()
        );
        ProcessorResult::error(
            raw,
            ParseErrors::new(ErrorType::SecurityViolation, message).with_violations(violations),
        )
    }
}

impl Processor for HtmlProcessor {
    fn process(&self, raw: &str) -> ProcessorResult {
        catch_unexpected(raw, || Self::validate(raw))
    }
}

/// Collect violations in document order.
fn scan(roots: &[Element]) -> Vec<Violation> {
    let mut violations = Vec::new();
    for root in roots {
        root.walk(&mut |element| inspect(element, &mut violations));
    }
    violations
}

fn inspect(element: &Element, violations: &mut Vec<Violation>) {
    if element.name == "script" {
        violations.push(Violation {
            violation_type: ViolationType::ScriptTag,
            element: element.name.clone(),
            attribute: None,
        });
    }

    for (name, value) in &element.attrs {
        if EVENT_HANDLER_ATTRIBUTES.contains(&name.as_str()) {
            violations.push(Violation {
                violation_type: ViolationType::EventHandler,
                element: element.name.clone(),
                attribute: Some(name.clone()),
            });
        } else if URL_ATTRIBUTES.contains(&name.as_str()) && is_javascript_url(value) {
            violations.push(Violation {
                violation_type: ViolationType::JavascriptProtocol,
                element: element.name.clone(),
                attribute: Some(name.clone()),
            });
        }
    }
}

fn is_javascript_url(value: &str) -> bool {
    value.trim().to_ascii_lowercase().starts_with("javascript:")
}
