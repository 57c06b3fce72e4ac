//! Lenient HTML element tree built on `quick-xml`.
//!
//! The reader runs in a forgiving mode: end tags need not match, void
//! elements (`<br>`, `<img>`) need no closing slash, a bare `&` is plain
//! text, and attributes may be unquoted or valueless. Anything the tokenizer still rejects (an unclosed
//! tag or comment, a malformed attribute) fails the whole document.

use quick_xml::events::{BytesStart, Event};
use quick_xml::reader::Reader;

/// Elements that never have content or an end tag.
const VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "source", "track",
    "wbr",
];

/// One element of the parsed document. Text is not retained.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct Element {
    /// Lowercased tag name.
    pub name: String,
    /// `(lowercased name, raw value)` pairs in source order.
    pub attrs: Vec<(String, String)>,
    pub children: Vec<Element>,
}

impl Element {
    /// Visit this element and its descendants in document order.
    pub fn walk<'a>(&'a self, visit: &mut impl FnMut(&'a Element)) {
        visit(self);
        for child in &self.children {
            child.walk(visit);
        }
    }
}

/// Tokenizer failure with the byte offset where it was detected.
#[derive(Debug)]
pub(crate) struct HtmlSyntaxError {
    pub message: String,
    pub offset: usize,
}

/// Parse an HTML fragment or document into its top-level elements.
pub(crate) fn parse(html: &str) -> Result<Vec<Element>, HtmlSyntaxError> {
    let mut reader = Reader::from_str(html);
    {
        let config = reader.config_mut();
        config.trim_text(false);
        config.check_end_names = false;
        config.allow_unmatched_ends = true;
        // `Fish & Chips`, `a && b` in scripts
        config.allow_dangling_amp = true;
    }

    let mut roots = Vec::new();
    let mut open: Vec<Element> = Vec::new();

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let element = decode_element(&e).map_err(|message| HtmlSyntaxError {
                    message,
                    offset: to_offset(reader.buffer_position()),
                })?;
                if VOID_ELEMENTS.contains(&element.name.as_str()) {
                    attach(&mut open, &mut roots, element);
                } else {
                    open.push(element);
                }
            }
            Ok(Event::Empty(e)) => {
                let element = decode_element(&e).map_err(|message| HtmlSyntaxError {
                    message,
                    offset: to_offset(reader.buffer_position()),
                })?;
                attach(&mut open, &mut roots, element);
            }
            Ok(Event::End(e)) => {
                let name = decode_name(e.name().as_ref());
                // Close everything up to the nearest matching open element;
                // a stray end tag with no match is ignored.
                if let Some(pos) = open.iter().rposition(|el| el.name == name) {
                    while open.len() > pos {
                        if let Some(element) = open.pop() {
                            attach(&mut open, &mut roots, element);
                        }
                    }
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                return Err(HtmlSyntaxError {
                    message: e.to_string(),
                    offset: to_offset(reader.error_position()),
                });
            }
        }
    }

    // Unclosed elements end with the document
    while let Some(element) = open.pop() {
        attach(&mut open, &mut roots, element);
    }

    Ok(roots)
}

fn attach(open: &mut [Element], roots: &mut Vec<Element>, element: Element) {
    match open.last_mut() {
        Some(parent) => parent.children.push(element),
        None => roots.push(element),
    }
}

fn decode_element(start: &BytesStart<'_>) -> Result<Element, String> {
    let name = decode_name(start.name().as_ref());
    let mut attrs = Vec::new();
    for attr in start.html_attributes() {
        let attr = attr.map_err(|e| format!("malformed attribute in <{name}>: {e}"))?;
        attrs.push((
            decode_name(attr.key.as_ref()),
            String::from_utf8_lossy(&attr.value).into_owned(),
        ));
    }
    Ok(Element {
        name,
        attrs,
        children: Vec::new(),
    })
}

fn decode_name(bytes: &[u8]) -> String {
    String::from_utf8_lossy(bytes).to_ascii_lowercase()
}

fn to_offset(position: u64) -> usize {
    usize::try_from(position).unwrap_or(usize::MAX)
}
