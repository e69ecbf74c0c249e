//! Per-run state and the run outcome.
//!
//! A [`RunContext`] owns the progress state and the accumulated diagnostics
//! for exactly one build run. [`RunContext::finish`] consumes it, so nothing
//! carries over into the next run.

use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::classifier::Classifier;
use crate::config::{RunMode, VerdictPolicy};
use crate::diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSet};
use crate::progress::{ProgressState, ProgressTracker};

/// Mutable state of one analyzed run.
#[derive(Debug)]
pub struct RunContext {
    classifier: Classifier,
    tracker: ProgressTracker,
    warnings: DiagnosticSet,
    errors: DiagnosticSet,
    link_errors: DiagnosticSet,
    lines: u64,
}

impl Default for RunContext {
    fn default() -> Self {
        Self::new(Classifier::default())
    }
}

impl RunContext {
    pub fn new(classifier: Classifier) -> Self {
        Self {
            classifier,
            tracker: ProgressTracker::new(),
            warnings: DiagnosticSet::new(),
            errors: DiagnosticSet::new(),
            link_errors: DiagnosticSet::new(),
            lines: 0,
        }
    }

    /// Feed one output line to the tracker and the classifier.
    ///
    /// Returns the kind of the diagnostic the line produced, if any.
    pub fn observe_line(&mut self, line: &str) -> Option<DiagnosticKind> {
        self.lines += 1;
        self.tracker.observe(line);

        let diagnostic = self.classifier.classify(line)?;
        let kind = diagnostic.kind;
        let set = match kind {
            DiagnosticKind::Warning => &mut self.warnings,
            DiagnosticKind::Error => &mut self.errors,
            DiagnosticKind::LinkError => &mut self.link_errors,
        };
        if !set.insert(diagnostic) {
            debug!(kind = ?kind, "duplicate diagnostic collapsed");
        }
        Some(kind)
    }

    pub fn progress(&self) -> ProgressState {
        self.tracker.state()
    }

    /// Current progress line.
    pub fn render_progress(&self) -> String {
        self.tracker.render()
    }

    /// Lines observed so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Diagnostics collapsed into an earlier identical record.
    pub fn duplicates(&self) -> usize {
        self.warnings.repeats() + self.errors.repeats() + self.link_errors.repeats()
    }

    /// Close the run and compute its outcome.
    pub fn finish(
        self,
        exit_code: Option<i32>,
        policy: VerdictPolicy,
        elapsed: Duration,
    ) -> RunOutcome {
        RunOutcome::analyzed(
            self.warnings,
            self.errors,
            self.link_errors,
            exit_code,
            policy,
            elapsed,
        )
    }
}

/// Result of one build run, handed to the reporter and the caller.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RunOutcome {
    pub mode: RunMode,

    /// Whether the build is considered successful.
    pub succeeded: bool,

    /// Exit code of the build tool, when one was observed.
    pub exit_code: Option<i32>,

    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,

    pub warnings: Vec<Diagnostic>,
    pub errors: Vec<Diagnostic>,
    pub link_errors: Vec<Diagnostic>,
}

impl RunOutcome {
    /// Outcome of an analyzed run. Warnings never affect the verdict.
    pub fn analyzed(
        warnings: DiagnosticSet,
        errors: DiagnosticSet,
        link_errors: DiagnosticSet,
        exit_code: Option<i32>,
        policy: VerdictPolicy,
        elapsed: Duration,
    ) -> Self {
        let clean = errors.is_empty() && link_errors.is_empty();
        let succeeded = match policy {
            VerdictPolicy::DiagnosticsOnly => clean,
            VerdictPolicy::IncludeExitCode => clean && exit_code.unwrap_or(0) == 0,
        };
        Self {
            mode: RunMode::Analyzed,
            succeeded,
            exit_code,
            duration_ms: elapsed.as_millis() as u64,
            warnings: warnings.into_vec(),
            errors: errors.into_vec(),
            link_errors: link_errors.into_vec(),
        }
    }

    /// Outcome of a passthrough run, judged by exit code alone.
    pub fn passthrough(exit_code: Option<i32>, elapsed: Duration) -> Self {
        Self {
            mode: RunMode::Passthrough,
            succeeded: exit_code == Some(0),
            exit_code,
            duration_ms: elapsed.as_millis() as u64,
            warnings: Vec::new(),
            errors: Vec::new(),
            link_errors: Vec::new(),
        }
    }

    /// Outcome of a dry run.
    pub fn dry_run() -> Self {
        Self {
            mode: RunMode::DryRun,
            succeeded: true,
            exit_code: None,
            duration_ms: 0,
            warnings: Vec::new(),
            errors: Vec::new(),
            link_errors: Vec::new(),
        }
    }

    /// Whether any diagnostic of any kind was collected.
    pub fn has_diagnostics(&self) -> bool {
        !(self.warnings.is_empty() && self.errors.is_empty() && self.link_errors.is_empty())
    }

    /// Human-readable reasons the build failed (empty when it succeeded).
    pub fn failure_reasons(&self) -> Vec<String> {
        let mut reasons = Vec::new();
        if !self.errors.is_empty() {
            reasons.push(format!("{} compile error(s)", self.errors.len()));
        }
        if !self.link_errors.is_empty() {
            reasons.push(format!("{} linker error(s)", self.link_errors.len()));
        }
        if !self.succeeded && reasons.is_empty() {
            match self.exit_code {
                Some(code) => reasons.push(format!("build tool exited with code {}", code)),
                None => reasons.push("build tool terminated by a signal".to_string()),
            }
        }
        reasons
    }
}
