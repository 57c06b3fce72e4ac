//! Sidecar metadata parsing.
//!
//! Every content file `name.{md,html,tmpl}` is paired with a `name.yaml`
//! sidecar carrying its attributes. `title`, `slug` and `type` are required;
//! a fixed set of optional keys is promoted to typed fields and anything else
//! passes through untouched in [`ContentMetadata::extra`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use chrono::{DateTime, NaiveDate, Utc};
use serde_yaml::{Mapping, Value};

use crate::model::{ContentType, ErrorType, ParseErrors};

/// Keys that must be present and non-blank.
const REQUIRED_KEYS: [&str; 3] = ["title", "slug", "type"];

/// Optional keys promoted to typed fields.
const OPTIONAL_KEYS: [&str; 9] = [
    "publish_at",
    "expires_at",
    "meta_title",
    "meta_description",
    "og_image",
    "og_title",
    "og_description",
    "tags",
    "protected",
];

/// Typed contents of a sidecar file.
#[derive(Debug, Clone, PartialEq)]
pub struct ContentMetadata {
    pub title: String,
    pub slug: String,
    pub content_type: ContentType,
    pub publish_at: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub meta_title: Option<String>,
    pub meta_description: Option<String>,
    pub og_image: Option<String>,
    pub og_title: Option<String>,
    pub og_description: Option<String>,
    pub tags: Vec<String>,
    pub protected: bool,
    /// Unrecognized keys, kept for forward compatibility.
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// Sidecar parse failure.
#[derive(Debug, thiserror::Error)]
pub enum MetadataError {
    /// The sidecar does not exist or cannot be read.
    #[error("metadata file not found: {}", path.display())]
    FileNotFound {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The sidecar is not valid YAML.
    #[error("invalid YAML: {message}")]
    Syntax {
        message: String,
        line: Option<usize>,
        column: Option<usize>,
    },
    /// The YAML parses but does not describe valid content metadata.
    #[error("invalid metadata structure: {message}")]
    InvalidStructure {
        message: String,
        missing_fields: Vec<String>,
    },
}

impl MetadataError {
    fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidStructure {
            message: message.into(),
            missing_fields: Vec::new(),
        }
    }

    /// Convert into the error shape stored with content.
    #[must_use]
    pub fn to_parse_errors(&self) -> ParseErrors {
        match self {
            Self::FileNotFound { .. } => ParseErrors::new(ErrorType::FileNotFound, self.to_string()),
            Self::Syntax { line, column, .. } => {
                ParseErrors::new(ErrorType::SyntaxError, self.to_string())
                    .with_position(*line, *column)
            }
            Self::InvalidStructure { missing_fields, .. } => {
                ParseErrors::new(ErrorType::InvalidStructure, self.to_string())
                    .with_missing_fields(missing_fields.clone())
            }
        }
    }
}

/// Read and parse a sidecar file.
///
/// Performs exactly one read; there are no retries.
///
/// # Errors
///
/// Returns [`MetadataError::FileNotFound`] if the file cannot be read, and the
/// errors of [`parse_str`] otherwise.
pub fn parse(path: &Path) -> Result<ContentMetadata, MetadataError> {
    let content = std::fs::read_to_string(path).map_err(|source| MetadataError::FileNotFound {
        path: path.to_path_buf(),
        source,
    })?;
    parse_str(&content)
}

/// Parse sidecar YAML held in memory.
///
/// # Errors
///
/// Returns [`MetadataError::Syntax`] for malformed YAML and
/// [`MetadataError::InvalidStructure`] when the document is not a mapping,
/// misses required keys, or has values of the wrong shape.
pub fn parse_str(content: &str) -> Result<ContentMetadata, MetadataError> {
    let value: Value = if content.trim().is_empty() {
        Value::Null
    } else {
        serde_yaml::from_str(content).map_err(|e| {
            let location = e.location();
            MetadataError::Syntax {
                message: e.to_string(),
                line: location.as_ref().map(serde_yaml::Location::line),
                column: location.as_ref().map(serde_yaml::Location::column),
            }
        })?
    };

    let mapping = match value {
        Value::Mapping(mapping) => mapping,
        // An empty document has no keys at all
        Value::Null => Mapping::new(),
        _ => return Err(MetadataError::invalid("expected a mapping at the top level")),
    };

    let missing_fields: Vec<String> = REQUIRED_KEYS
        .iter()
        .filter(|key| required_string(&mapping, key).is_none())
        .map(|key| (*key).to_owned())
        .collect();
    if !missing_fields.is_empty() {
        return Err(MetadataError::InvalidStructure {
            message: format!("missing required keys: {}", missing_fields.join(", ")),
            missing_fields,
        });
    }

    let title = required_string(&mapping, "title").unwrap_or_default();
    let slug = required_string(&mapping, "slug").unwrap_or_default();
    let type_name = required_string(&mapping, "type").unwrap_or_default();
    let content_type = ContentType::parse(&type_name).ok_or_else(|| {
        let expected: Vec<_> = ContentType::ALL.iter().map(|t| t.as_str()).collect();
        MetadataError::invalid(format!(
            "unknown content type '{type_name}', expected one of {}",
            expected.join(", ")
        ))
    })?;

    Ok(ContentMetadata {
        title,
        slug,
        content_type,
        publish_at: optional_timestamp(&mapping, "publish_at")?,
        expires_at: optional_timestamp(&mapping, "expires_at")?,
        meta_title: optional_string(&mapping, "meta_title")?,
        meta_description: optional_string(&mapping, "meta_description")?,
        og_image: optional_string(&mapping, "og_image")?,
        og_title: optional_string(&mapping, "og_title")?,
        og_description: optional_string(&mapping, "og_description")?,
        tags: tags(&mapping)?,
        protected: protected(&mapping)?,
        extra: extra_keys(&mapping)?,
    })
}

/// Scalar rendered as a string; numbers are accepted for slugs like `2024`.
fn scalar_string(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn required_string(mapping: &Mapping, key: &str) -> Option<String> {
    mapping
        .get(key)
        .and_then(scalar_string)
        .map(|s| s.trim().to_owned())
        .filter(|s| !s.is_empty())
}

fn optional_string(mapping: &Mapping, key: &str) -> Result<Option<String>, MetadataError> {
    match mapping.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => scalar_string(value)
            .map(Some)
            .ok_or_else(|| MetadataError::invalid(format!("'{key}' must be a string"))),
    }
}

fn optional_timestamp(
    mapping: &Mapping,
    key: &str,
) -> Result<Option<DateTime<Utc>>, MetadataError> {
    let Some(raw) = optional_string(mapping, key)? else {
        return Ok(None);
    };
    parse_timestamp(raw.trim()).map(Some).ok_or_else(|| {
        MetadataError::invalid(format!(
            "'{key}' must be an RFC 3339 timestamp or a YYYY-MM-DD date, got '{raw}'"
        ))
    })
}

fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(raw) {
        return Some(ts.with_timezone(&Utc));
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|dt| dt.and_utc())
}

/// Tags as a YAML list, or a single comma-separated string.
fn tags(mapping: &Mapping) -> Result<Vec<String>, MetadataError> {
    match mapping.get("tags") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Sequence(items)) => items
            .iter()
            .map(|item| {
                scalar_string(item)
                    .ok_or_else(|| MetadataError::invalid("'tags' entries must be strings"))
            })
            .collect(),
        Some(Value::String(s)) => Ok(s
            .split(',')
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .map(str::to_owned)
            .collect()),
        Some(_) => Err(MetadataError::invalid("'tags' must be a list of strings")),
    }
}

fn protected(mapping: &Mapping) -> Result<bool, MetadataError> {
    match mapping.get("protected") {
        None | Some(Value::Null) => Ok(false),
        Some(Value::Bool(b)) => Ok(*b),
        Some(_) => Err(MetadataError::invalid("'protected' must be true or false")),
    }
}

fn extra_keys(mapping: &Mapping) -> Result<BTreeMap<String, serde_json::Value>, MetadataError> {
    let mut extra = BTreeMap::new();
    for (key, value) in mapping {
        let Some(key) = key.as_str() else {
            return Err(MetadataError::invalid("metadata keys must be strings"));
        };
        if REQUIRED_KEYS.contains(&key) || OPTIONAL_KEYS.contains(&key) {
            continue;
        }
        let json = serde_json::to_value(value)
            .map_err(|e| MetadataError::invalid(format!("'{key}' cannot be represented: {e}")))?;
        extra.insert(key.to_owned(), json);
    }
    Ok(extra)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_required_fields() {
        let meta = parse_str("title: Hello\nslug: hello\ntype: blog\n").unwrap();

        assert_eq!(meta.title, "Hello");
        assert_eq!(meta.slug, "hello");
        assert_eq!(meta.content_type, ContentType::Blog);
        assert!(meta.tags.is_empty());
        assert!(!meta.protected);
        assert!(meta.extra.is_empty());
    }

    #[test]
    fn test_parse_all_optional_fields() {
        let yaml = r#"
title: "Launch"
slug: launch
type: landing
publish_at: 2024-03-01T09:00:00+02:00
expires_at: 2024-04-01
meta_title: Launch | Acme
meta_description: Big launch
og_image: /img/launch.png
og_title: Launch
og_description: It is here
tags:
  - product
  - news
protected: true
"#;
        let meta = parse_str(yaml).unwrap();

        assert_eq!(meta.content_type, ContentType::Landing);
        assert_eq!(
            meta.publish_at.map(|t| t.to_rfc3339()),
            Some("2024-03-01T07:00:00+00:00".to_owned())
        );
        assert_eq!(
            meta.expires_at.map(|t| t.to_rfc3339()),
            Some("2024-04-01T00:00:00+00:00".to_owned())
        );
        assert_eq!(meta.meta_title.as_deref(), Some("Launch | Acme"));
        assert_eq!(meta.og_image.as_deref(), Some("/img/launch.png"));
        assert_eq!(meta.tags, vec!["product".to_owned(), "news".to_owned()]);
        assert!(meta.protected);
        assert!(meta.extra.is_empty());
    }

    #[test]
    fn test_unknown_keys_pass_through() {
        let yaml = "title: A\nslug: a\ntype: page\nauthor: Sam\nlayout:\n  columns: 2\n";
        let meta = parse_str(yaml).unwrap();

        assert_eq!(meta.extra.get("author"), Some(&serde_json::json!("Sam")));
        assert_eq!(
            meta.extra.get("layout"),
            Some(&serde_json::json!({ "columns": 2 }))
        );
    }

    #[test]
    fn test_missing_required_keys_listed() {
        let err = parse_str("title: Only a title\n").unwrap_err();

        match err {
            MetadataError::InvalidStructure { missing_fields, .. } => {
                assert_eq!(missing_fields, vec!["slug".to_owned(), "type".to_owned()]);
            }
            other => panic!("expected InvalidStructure, got {other:?}"),
        }
    }

    #[test]
    fn test_blank_required_value_counts_as_missing() {
        let err = parse_str("title: '  '\nslug: a\ntype: blog\n").unwrap_err();
        let errors = err.to_parse_errors();

        assert_eq!(errors.error_type, ErrorType::InvalidStructure);
        assert_eq!(errors.missing_fields, vec!["title".to_owned()]);
    }

    #[test]
    fn test_empty_document_misses_everything() {
        let err = parse_str("").unwrap_err();
        let errors = err.to_parse_errors();

        assert_eq!(errors.missing_fields.len(), 3);
    }

    #[test]
    fn test_non_mapping_root_is_invalid_structure() {
        let err = parse_str("- a\n- b\n").unwrap_err();
        assert!(matches!(err, MetadataError::InvalidStructure { .. }));
    }

    #[test]
    fn test_unknown_content_type() {
        let err = parse_str("title: A\nslug: a\ntype: article\n").unwrap_err();

        assert!(matches!(err, MetadataError::InvalidStructure { .. }));
        assert!(err.to_string().contains("article"));
    }

    #[test]
    fn test_syntax_error_has_position() {
        let err = parse_str("title: [unclosed\nslug: a\n").unwrap_err();
        let errors = err.to_parse_errors();

        assert_eq!(errors.error_type, ErrorType::SyntaxError);
        assert!(errors.line.is_some());
        assert!(errors.column.is_some());
    }

    #[test]
    fn test_bad_timestamp_is_invalid_structure() {
        let err = parse_str("title: A\nslug: a\ntype: blog\npublish_at: next tuesday\n").unwrap_err();

        assert!(matches!(err, MetadataError::InvalidStructure { .. }));
        assert!(err.to_string().contains("publish_at"));
    }

    #[test]
    fn test_protected_must_be_bool() {
        let err = parse_str("title: A\nslug: a\ntype: blog\nprotected: 'yes'\n").unwrap_err();
        assert!(matches!(err, MetadataError::InvalidStructure { .. }));
    }

    #[test]
    fn test_tags_comma_separated_string() {
        let meta = parse_str("title: A\nslug: a\ntype: blog\ntags: rust, cms ,\n").unwrap();
        assert_eq!(meta.tags, vec!["rust".to_owned(), "cms".to_owned()]);
    }

    #[test]
    fn test_numeric_slug_accepted() {
        let meta = parse_str("title: Year in review\nslug: 2024\ntype: blog\n").unwrap();
        assert_eq!(meta.slug, "2024");
    }

    #[test]
    fn test_parse_missing_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let err = parse(&temp_dir.path().join("absent.yaml")).unwrap_err();

        assert!(matches!(err, MetadataError::FileNotFound { .. }));
        assert_eq!(err.to_parse_errors().error_type, ErrorType::FileNotFound);
    }

    #[test]
    fn test_parse_reads_file() {
        let temp_dir = tempfile::tempdir().unwrap();
        let path = temp_dir.path().join("post.yaml");
        std::fs::write(&path, "title: Post\nslug: post\ntype: documentation\n").unwrap();

        let meta = parse(&path).unwrap();
        assert_eq!(meta.content_type, ContentType::Documentation);
    }
}
