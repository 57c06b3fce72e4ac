//! Tenant and project a sync runs for.

use std::fmt;

use serde::Serialize;

/// Topic prefix for sync notifications.
const TOPIC_PREFIX: &str = "content_sync";

/// Identity a sync runs under.
///
/// Content is partitioned by tenant: a sync replaces everything stored for
/// its tenant and nothing else. The project is carried for callers that
/// fetch content per project and is not part of the partition key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Scope {
    tenant: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    project: Option<String>,
}

impl Scope {
    #[must_use]
    pub fn new(tenant: impl Into<String>) -> Self {
        Self {
            tenant: tenant.into(),
            project: None,
        }
    }

    #[must_use]
    pub fn with_project(mut self, project: impl Into<String>) -> Self {
        self.project = Some(project.into());
        self
    }

    #[must_use]
    pub fn tenant(&self) -> &str {
        &self.tenant
    }

    #[must_use]
    pub fn project(&self) -> Option<&str> {
        self.project.as_deref()
    }

    /// Whether the tenant identifier is usable (non-blank).
    #[must_use]
    pub fn has_tenant(&self) -> bool {
        !self.tenant.trim().is_empty()
    }

    /// Notification topic for this scope: `content_sync:{tenant}`.
    #[must_use]
    pub fn topic(&self) -> String {
        format!("{TOPIC_PREFIX}:{}", self.tenant)
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.project {
            Some(project) => write!(f, "{}/{project}", self.tenant),
            None => f.write_str(&self.tenant),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_topic() {
        assert_eq!(Scope::new("acme").topic(), "content_sync:acme");
    }

    #[test]
    fn test_blank_tenant() {
        assert!(!Scope::new("").has_tenant());
        assert!(!Scope::new("  \t").has_tenant());
        assert!(Scope::new("acme").has_tenant());
    }

    #[test]
    fn test_display_with_project() {
        let scope = Scope::new("acme").with_project("site");
        assert_eq!(scope.to_string(), "acme/site");
        assert_eq!(scope.project(), Some("site"));
        assert_eq!(Scope::new("acme").to_string(), "acme");
    }
}
