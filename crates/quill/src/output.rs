//! Colored terminal output utilities.

use console::{Style, Term};
use quill_sync::SyncSummary;

/// Terminal output formatter. Writes to stderr.
pub(crate) struct Output {
    term: Term,
    green: Style,
    yellow: Style,
    red: Style,
    cyan_bold: Style,
}

impl Output {
    #[must_use]
    pub(crate) fn new() -> Self {
        Self {
            term: Term::stderr(),
            green: Style::new().green(),
            yellow: Style::new().yellow(),
            red: Style::new().red(),
            cyan_bold: Style::new().cyan().bold(),
        }
    }

    pub(crate) fn info(&self, msg: &str) {
        let _ = self.term.write_line(msg);
    }

    /// Print a warning message (yellow).
    pub(crate) fn warning(&self, msg: &str) {
        let _ = self.term.write_line(&self.yellow.apply_to(msg).to_string());
    }

    /// Print an error message (red).
    pub(crate) fn error(&self, msg: &str) {
        let _ = self.term.write_line(&self.red.apply_to(msg).to_string());
    }

    /// Print a highlighted message (cyan bold).
    pub(crate) fn highlight(&self, msg: &str) {
        let _ = self
            .term
            .write_line(&self.cyan_bold.apply_to(msg).to_string());
    }

    /// Print a sync summary: green when every file validated, yellow otherwise.
    pub(crate) fn summary(&self, summary: &SyncSummary) {
        let headline = format!(
            "Synced {} file(s) in {} ms: {} ok, {} with errors",
            summary.total_files, summary.duration_ms, summary.successful, summary.errors
        );
        let style = if summary.errors == 0 {
            &self.green
        } else {
            &self.yellow
        };
        let _ = self.term.write_line(&style.apply_to(headline).to_string());

        for (content_type, count) in &summary.content_types {
            self.info(&format!("  {content_type}: {count}"));
        }
        if summary.errors > 0 {
            self.warning(
                "Files with errors were stored with their error details; \
                 run with --verbose to list them.",
            );
        }
    }
}
