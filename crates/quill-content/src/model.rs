//! Content data model.
//!
//! Types shared by the metadata parser, the content processors and the sync
//! engine. Everything here is plain data: serializable, cloneable and free of
//! I/O.

use std::collections::BTreeMap;
use std::fmt;
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::metadata::ContentMetadata;

/// Content type declared by the `type` key of a sidecar.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentType {
    Blog,
    Page,
    Landing,
    Documentation,
}

impl ContentType {
    /// All content types in declaration order.
    pub const ALL: [Self; 4] = [Self::Blog, Self::Page, Self::Landing, Self::Documentation];

    /// Parse a content type from its sidecar spelling.
    ///
    /// Matching is exact: `"blog"` is accepted, `"Blog"` is not.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|t| t.as_str() == value)
    }

    /// Sidecar and storage spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Blog => "blog",
            Self::Page => "page",
            Self::Landing => "landing",
            Self::Documentation => "documentation",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Source format of a content file, derived from its extension.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContentFormat {
    /// `.md`
    Markdown,
    /// `.html`
    Html,
    /// `.tmpl`
    Template,
}

impl ContentFormat {
    /// All supported formats.
    pub const ALL: [Self; 3] = [Self::Markdown, Self::Html, Self::Template];

    /// File extension (without the dot).
    #[must_use]
    pub fn extension(self) -> &'static str {
        match self {
            Self::Markdown => "md",
            Self::Html => "html",
            Self::Template => "tmpl",
        }
    }

    /// Format for a bare extension such as `"md"`.
    #[must_use]
    pub fn from_extension(ext: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.extension() == ext)
    }

    /// Format for a file path, based on its extension.
    #[must_use]
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(Self::from_extension)
    }

    /// Parse the storage spelling produced by [`as_str`](Self::as_str).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|f| f.as_str() == value)
    }

    /// Storage spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Markdown => "markdown",
            Self::Html => "html",
            Self::Template => "template",
        }
    }
}

/// Outcome of validating one file.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ParseStatus {
    Success,
    Error,
}

impl ParseStatus {
    /// Parse the storage spelling produced by [`as_str`](Self::as_str).
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "success" => Some(Self::Success),
            "error" => Some(Self::Error),
            _ => None,
        }
    }

    /// Storage spelling.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }
}

/// Category of a per-file error.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorType {
    /// Content or sidecar does not parse.
    SyntaxError,
    /// HTML contains active content.
    SecurityViolation,
    /// A processor failed in an unforeseen way.
    UnexpectedError,
    /// Sidecar file is missing or unreadable.
    FileNotFound,
    /// Sidecar parses but lacks required keys or has malformed values.
    InvalidStructure,
    /// Content file could not be read.
    ReadError,
}

/// Kind of disallowed active content found in HTML.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationType {
    /// A `<script>` element.
    ScriptTag,
    /// An inline `on*` event handler attribute.
    EventHandler,
    /// An `href`/`src` value using the `javascript:` scheme.
    JavascriptProtocol,
}

/// One instance of disallowed active content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Violation {
    #[serde(rename = "type")]
    pub violation_type: ViolationType,
    /// Lowercased element name (e.g. `"a"`).
    pub element: String,
    /// Lowercased attribute name, for attribute-based violations.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

/// Structured per-file error detail, stored alongside the content.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParseErrors {
    pub error_type: ErrorType,
    pub message: String,
    /// 1-based line, when the failure has a position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line: Option<usize>,
    /// 1-based column, when the failure has a position.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub violations: Vec<Violation>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub missing_fields: Vec<String>,
}

impl ParseErrors {
    /// Create an error record without position or detail lists.
    #[must_use]
    pub fn new(error_type: ErrorType, message: impl Into<String>) -> Self {
        Self {
            error_type,
            message: message.into(),
            line: None,
            column: None,
            violations: Vec::new(),
            missing_fields: Vec::new(),
        }
    }

    /// Attach a source position.
    #[must_use]
    pub fn with_position(mut self, line: Option<usize>, column: Option<usize>) -> Self {
        self.line = line;
        self.column = column;
        self
    }

    /// Attach security findings.
    #[must_use]
    pub fn with_violations(mut self, violations: Vec<Violation>) -> Self {
        self.violations = violations;
        self
    }

    /// Attach the names of missing required sidecar keys.
    #[must_use]
    pub fn with_missing_fields(mut self, fields: Vec<String>) -> Self {
        self.missing_fields = fields;
        self
    }
}

/// Result of running a processor over one file's text.
///
/// Processors never fail: a problem with the content is reported through the
/// [`Error`](Self::Error) variant so that one malformed file cannot abort a
/// batch.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ProcessorResult {
    Success {
        raw_content: String,
        processed_content: Option<String>,
    },
    Error {
        raw_content: String,
        processed_content: Option<String>,
        errors: ParseErrors,
    },
}

impl ProcessorResult {
    /// Successful result.
    #[must_use]
    pub fn success(raw_content: impl Into<String>, processed_content: Option<String>) -> Self {
        Self::Success {
            raw_content: raw_content.into(),
            processed_content,
        }
    }

    /// Failed result with no processed content.
    #[must_use]
    pub fn error(raw_content: impl Into<String>, errors: ParseErrors) -> Self {
        Self::Error {
            raw_content: raw_content.into(),
            processed_content: None,
            errors,
        }
    }

    #[must_use]
    pub fn raw_content(&self) -> &str {
        match self {
            Self::Success { raw_content, .. } | Self::Error { raw_content, .. } => raw_content,
        }
    }

    #[must_use]
    pub fn processed_content(&self) -> Option<&str> {
        match self {
            Self::Success {
                processed_content, ..
            }
            | Self::Error {
                processed_content, ..
            } => processed_content.as_deref(),
        }
    }

    #[must_use]
    pub fn parse_status(&self) -> ParseStatus {
        match self {
            Self::Success { .. } => ParseStatus::Success,
            Self::Error { .. } => ParseStatus::Error,
        }
    }

    #[must_use]
    pub fn parse_errors(&self) -> Option<&ParseErrors> {
        match self {
            Self::Success { .. } => None,
            Self::Error { errors, .. } => Some(errors),
        }
    }

    /// Split into `(raw, processed, errors)`.
    #[must_use]
    pub fn into_parts(self) -> (String, Option<String>, Option<ParseErrors>) {
        match self {
            Self::Success {
                raw_content,
                processed_content,
            } => (raw_content, processed_content, None),
            Self::Error {
                raw_content,
                processed_content,
                errors,
            } => (raw_content, processed_content, Some(errors)),
        }
    }
}

/// Per-file aggregate written to the content store.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ContentAttributes {
    pub slug: String,
    pub title: String,
    pub content_type: ContentType,
    pub format: ContentFormat,
    /// File name of the content file inside the synced directory.
    pub source_path: String,
    pub raw_content: String,
    pub processed_content: Option<String>,
    pub parse_status: ParseStatus,
    pub parse_errors: Option<ParseErrors>,
    pub publish_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub og_image: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub tags: Vec<String>,
    pub protected: bool,
    /// Sidecar keys with no typed counterpart.
    pub metadata: BTreeMap<String, serde_json::Value>,
}

impl ContentAttributes {
    /// Merge parsed sidecar metadata with a processor result.
    #[must_use]
    pub fn from_processed(
        meta: ContentMetadata,
        format: ContentFormat,
        source_path: impl Into<String>,
        result: ProcessorResult,
    ) -> Self {
        let parse_status = result.parse_status();
        let (raw_content, processed_content, parse_errors) = result.into_parts();

        Self {
            slug: meta.slug,
            title: meta.title,
            content_type: meta.content_type,
            format,
            source_path: source_path.into(),
            raw_content,
            processed_content,
            parse_status,
            parse_errors,
            publish_at: meta.publish_at,
            expires_at: meta.expires_at,
            meta_title: meta.meta_title,
            meta_description: meta.meta_description,
            og_image: meta.og_image,
            og_title: meta.og_title,
            og_description: meta.og_description,
            tags: meta.tags,
            protected: meta.protected,
            metadata: meta.extra,
        }
    }

    /// Record for a file whose metadata could not be used.
    ///
    /// Carries the raw content and the error so the author can see what went
    /// wrong; everything the sidecar would have supplied is defaulted.
    #[must_use]
    pub fn placeholder(
        slug: impl Into<String>,
        title: impl Into<String>,
        format: ContentFormat,
        source_path: impl Into<String>,
        raw_content: impl Into<String>,
        errors: ParseErrors,
    ) -> Self {
        let mut metadata = BTreeMap::new();
        metadata.insert("sync_placeholder".to_owned(), serde_json::Value::Bool(true));

        Self {
            slug: slug.into(),
            title: title.into(),
            content_type: ContentType::Page,
            format,
            source_path: source_path.into(),
            raw_content: raw_content.into(),
            processed_content: None,
            parse_status: ParseStatus::Error,
            parse_errors: Some(errors),
            publish_at: None,
            expires_at: None,
            meta_title: None,
            meta_description: None,
            og_image: None,
            og_title: None,
            og_description: None,
            tags: Vec::new(),
            protected: false,
            metadata,
        }
    }

    /// True for records built by [`placeholder`](Self::placeholder).
    #[must_use]
    pub fn is_placeholder(&self) -> bool {
        self.metadata
            .get("sync_placeholder")
            .is_some_and(|v| v.as_bool() == Some(true))
    }
}
