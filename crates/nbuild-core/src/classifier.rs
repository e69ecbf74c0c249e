//! Line classifier for compiler and linker output.
//!
//! Classification is driven by an ordered pattern table. Each entry names the
//! diagnostic kind it produces, the regex searched for in the line and how the
//! captured groups map onto record fields. The first entry that matches wins,
//! so adding a new diagnostic shape means adding a table row.

use regex::{Captures, Regex};
use std::sync::LazyLock;
use tracing::trace;

use crate::diagnostic::{Diagnostic, DiagnosticKind};

const ERROR_PATTERN: &str = r"(?P<file>.*):(?P<line>\d+):(?P<column>\d+):\s+error:\s+(?P<message>.*)";
const WARNING_PATTERN: &str =
    r"(?P<file>.*):(?P<line>\d+):(?P<column>\d+):\s+warning:\s+(?P<message>.*)";
const LINK_ERROR_PATTERN: &str = r"^\s*(?P<message>(?:\S*/)?ld(?:\.[A-Za-z]+)?: .*)";

static BUILTIN: LazyLock<Classifier> = LazyLock::new(Classifier::builtin);

/// How captured groups become record fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldMapping {
    /// `file`, `line`, `column` and `message` groups.
    Located,
    /// Only a `message` group; the record has no location.
    MessageOnly,
}

/// One row of the classification table.
#[derive(Debug, Clone)]
pub struct DiagnosticPattern {
    pub kind: DiagnosticKind,
    pub regex: Regex,
    pub fields: FieldMapping,
}

impl DiagnosticPattern {
    /// Compile a table row. The regex must define the groups `fields` needs.
    pub fn new(
        kind: DiagnosticKind,
        pattern: &str,
        fields: FieldMapping,
    ) -> Result<Self, regex::Error> {
        Ok(Self {
            kind,
            regex: Regex::new(pattern)?,
            fields,
        })
    }

    /// Try this row against a line.
    pub fn extract(&self, line: &str) -> Option<Diagnostic> {
        let caps = self.regex.captures(line)?;
        let message = group(&caps, "message").unwrap_or_else(|| caps[0].to_string());

        match self.fields {
            FieldMapping::MessageOnly => Some(Diagnostic::new(self.kind, message)),
            FieldMapping::Located => {
                let file = group(&caps, "file")?;
                // Numbers too large for u32 are not compiler positions.
                let line_no = group(&caps, "line")?.parse::<u32>().ok()?;
                let column = group(&caps, "column")?.parse::<u32>().ok()?;
                Some(Diagnostic::new(self.kind, message).with_location(file, line_no, column))
            }
        }
    }
}

fn group(caps: &Captures<'_>, name: &str) -> Option<String> {
    caps.name(name).map(|m| m.as_str().to_string())
}

/// Ordered pattern table mapping a line to at most one diagnostic.
#[derive(Debug, Clone)]
pub struct Classifier {
    patterns: Vec<DiagnosticPattern>,
}

impl Default for Classifier {
    fn default() -> Self {
        BUILTIN.clone()
    }
}

impl Classifier {
    /// The GCC/Clang error, warning and `ld` link-error table, in that order.
    pub fn builtin() -> Self {
        let table = [
            (DiagnosticKind::Error, ERROR_PATTERN, FieldMapping::Located),
            (DiagnosticKind::Warning, WARNING_PATTERN, FieldMapping::Located),
            (
                DiagnosticKind::LinkError,
                LINK_ERROR_PATTERN,
                FieldMapping::MessageOnly,
            ),
        ];
        let patterns = table
            .into_iter()
            .map(|(kind, pattern, fields)| {
                DiagnosticPattern::new(kind, pattern, fields).expect("builtin pattern compiles")
            })
            .collect();
        Self { patterns }
    }

    /// Classifier over a caller-supplied table.
    pub fn with_patterns(patterns: Vec<DiagnosticPattern>) -> Self {
        Self { patterns }
    }

    /// Append a row with the lowest priority.
    pub fn push(&mut self, pattern: DiagnosticPattern) {
        self.patterns.push(pattern);
    }

    pub fn patterns(&self) -> &[DiagnosticPattern] {
        &self.patterns
    }

    /// First matching row's record, or `None` for unclassified output.
    pub fn classify(&self, line: &str) -> Option<Diagnostic> {
        let line = line.trim_end_matches(['\r', '\n']);
        let found = self.patterns.iter().find_map(|p| p.extract(line));
        if let Some(diag) = &found {
            trace!(kind = ?diag.kind, "classified build output line");
        }
        found
    }
}

/// Classify a line with the builtin table.
pub fn classify_line(line: &str) -> Option<Diagnostic> {
    BUILTIN.classify(line)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostic::Location;

    #[test]
    fn test_error_line() {
        let diag = classify_line("b.c:3:1: error: missing semicolon").expect("error");
        assert_eq!(diag.kind, DiagnosticKind::Error);
        assert_eq!(
            diag.location,
            Some(Location {
                file: "b.c".to_string(),
                line: 3,
                column: 1
            })
        );
        assert_eq!(diag.message, "missing semicolon");
    }

    #[test]
    fn test_warning_line() {
        let diag = classify_line("a.c:10:5: warning: unused variable 'x'").expect("warning");
        assert_eq!(diag.kind, DiagnosticKind::Warning);
        assert_eq!(diag.message, "unused variable 'x'");
        let loc = diag.location.expect("location");
        assert_eq!((loc.file.as_str(), loc.line, loc.column), ("a.c", 10, 5));
    }

    #[test]
    fn test_warning_with_flag_suffix() {
        let diag = classify_line(
            "../src/net/socket.cpp:88:17: warning: comparison of integers of different signs [-Wsign-compare]",
        )
        .expect("warning");
        assert_eq!(diag.location.as_ref().map(|l| l.file.as_str()), Some("../src/net/socket.cpp"));
        assert!(diag.message.ends_with("[-Wsign-compare]"));
    }

    #[test]
    fn test_match_inside_longer_banner() {
        let diag = classify_line("In file included from x.h: src/a.c:1:2: error: boom")
            .expect("error");
        assert_eq!(diag.kind, DiagnosticKind::Error);
        assert_eq!(diag.message, "boom");
    }

    #[test]
    fn test_link_error_ld() {
        let diag = classify_line("ld: undefined symbol _foo").expect("link error");
        assert_eq!(diag.kind, DiagnosticKind::LinkError);
        assert!(diag.location.is_none());
        assert_eq!(diag.message, "ld: undefined symbol _foo");
    }

    #[test]
    fn test_link_error_usr_bin_ld() {
        let diag = classify_line("/usr/bin/ld: cannot find -lfoo").expect("link error");
        assert_eq!(diag.kind, DiagnosticKind::LinkError);
        assert_eq!(diag.message, "/usr/bin/ld: cannot find -lfoo");
    }

    #[test]
    fn test_link_error_requires_line_start() {
        assert!(classify_line("[4/9] Linking CXX executable build: done").is_none());
    }

    #[test]
    fn test_error_has_priority_over_warning() {
        // A line carrying both shapes resolves to the first table row.
        let diag = classify_line("a.c:1:1: warning: see b.c:2:2: error: real").expect("diag");
        assert_eq!(diag.kind, DiagnosticKind::Error);
    }

    #[test]
    fn test_unclassified_lines() {
        for line in [
            "",
            "[1/2] compiling a.c",
            "ninja: build stopped: subcommand failed.",
            "note: declared here",
            "a.c:10: warning: missing column",
            "a.c:x:5: error: not numeric",
        ] {
            assert!(classify_line(line).is_none(), "unexpected match: {line}");
        }
    }

    #[test]
    fn test_trailing_newline_not_in_message() {
        let diag = classify_line("b.c:3:1: error: missing semicolon\r\n").expect("error");
        assert_eq!(diag.message, "missing semicolon");
    }

    #[test]
    fn test_oversized_line_number_is_ignored() {
        assert!(classify_line("a.c:99999999999:1: error: huge").is_none());
    }

    #[test]
    fn test_custom_row_extends_table() {
        let mut classifier = Classifier::builtin();
        classifier.push(
            DiagnosticPattern::new(
                DiagnosticKind::Error,
                r"^CMake Error: (?P<message>.*)",
                FieldMapping::MessageOnly,
            )
            .expect("pattern"),
        );
        assert_eq!(classifier.patterns().len(), 4);

        let diag = classifier
            .classify("CMake Error: could not find toolchain")
            .expect("custom match");
        assert_eq!(diag.kind, DiagnosticKind::Error);
        assert_eq!(diag.message, "could not find toolchain");
    }

    #[test]
    fn test_empty_table_matches_nothing() {
        let classifier = Classifier::with_patterns(Vec::new());
        assert!(classifier.classify("b.c:3:1: error: missing semicolon").is_none());
    }
}
