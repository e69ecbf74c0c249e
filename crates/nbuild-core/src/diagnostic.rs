//! Structured diagnostic records extracted from build output.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;

/// Kind of a diagnostic record.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum DiagnosticKind {
    Warning,
    Error,
    LinkError,
}

impl DiagnosticKind {
    /// Whether this kind fails the build.
    pub fn is_failure(&self) -> bool {
        matches!(self, DiagnosticKind::Error | DiagnosticKind::LinkError)
    }
}

/// Source position of a compiler diagnostic.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Location {
    pub file: String,

    /// Line number as printed by the compiler (1-indexed).
    pub line: u32,

    /// Column number as printed by the compiler (1-indexed).
    pub column: u32,
}

impl fmt::Display for Location {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.file, self.line, self.column)
    }
}

/// One warning, error or link error.
///
/// Two records are the same occurrence when kind, location and message are
/// all equal, which is exactly the derived `Eq`/`Hash`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,

    /// Absent for link errors.
    pub location: Option<Location>,

    pub message: String,
}

impl Diagnostic {
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            location: None,
            message: message.into(),
        }
    }

    /// Set file location.
    pub fn with_location(mut self, file: impl Into<String>, line: u32, column: u32) -> Self {
        self.location = Some(Location {
            file: file.into(),
            line,
            column,
        });
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(loc) => write!(f, "{}: {}", loc, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Insertion-ordered set of diagnostics of one kind.
#[derive(Debug, Clone, Default)]
pub struct DiagnosticSet {
    records: Vec<Diagnostic>,
    seen: HashSet<Diagnostic>,
    repeats: usize,
}

impl DiagnosticSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a record. Returns `false` if an identical record was already present.
    pub fn insert(&mut self, diagnostic: Diagnostic) -> bool {
        if self.seen.contains(&diagnostic) {
            self.repeats += 1;
            return false;
        }
        self.seen.insert(diagnostic.clone());
        self.records.push(diagnostic);
        true
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// How many inserts were collapsed into an existing record.
    pub fn repeats(&self) -> usize {
        self.repeats
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.records
    }
}

impl FromIterator<Diagnostic> for DiagnosticSet {
    fn from_iter<I: IntoIterator<Item = Diagnostic>>(iter: I) -> Self {
        let mut set = DiagnosticSet::new();
        for diagnostic in iter {
            set.insert(diagnostic);
        }
        set
    }
}
