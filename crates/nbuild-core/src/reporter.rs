//! Human-readable diagnostics report and the JSON outcome artifact.

use console::{Color, Style};
use std::io::Write;
use std::path::Path;

use crate::diagnostic::Diagnostic;
use crate::error::{BuildError, Result};
use crate::run::RunOutcome;

/// Prints the numbered diagnostic lists and the summary counts.
#[derive(Debug, Clone, Copy)]
pub struct Reporter {
    colors: bool,
}

impl Default for Reporter {
    fn default() -> Self {
        Self::for_terminal()
    }
}

impl Reporter {
    /// Colours on when stdout is a colour-capable terminal.
    pub fn for_terminal() -> Self {
        Self {
            colors: console::colors_enabled(),
        }
    }

    /// No escape sequences.
    pub fn plain() -> Self {
        Self { colors: false }
    }

    pub fn with_colors(colors: bool) -> Self {
        Self { colors }
    }

    /// Render the full report.
    pub fn render(&self, outcome: &RunOutcome) -> String {
        let mut out = String::new();

        let sections = [
            ("warnings", &outcome.warnings, Style::new().fg(Color::Yellow)),
            ("errors", &outcome.errors, Style::new().fg(Color::Red).bright()),
            ("linker errors", &outcome.link_errors, Style::new().fg(Color::Red)),
        ];

        for (title, records, style) in &sections {
            if records.is_empty() {
                continue;
            }
            out.push('\n');
            out.push_str(&self.paint(&numbered_list(title, records), style));
        }

        if !outcome.has_diagnostics() {
            out.push('\n');
            out.push_str(&self.paint(
                "No errors or warnings were found.\n",
                &Style::new().fg(Color::Green),
            ));
            return out;
        }

        out.push('\n');
        out.push_str(&self.paint(
            &format!("Found {} errors\n", outcome.errors.len()),
            &sections[1].2,
        ));
        out.push_str(&self.paint(
            &format!("Found {} warnings\n", outcome.warnings.len()),
            &sections[0].2,
        ));
        out.push_str(&self.paint(
            &format!("Found {} linker errors.\n", outcome.link_errors.len()),
            &sections[2].2,
        ));
        out
    }

    /// Write the report. Printing happens regardless of the verdict.
    pub fn report<W: Write>(&self, outcome: &RunOutcome, out: &mut W) -> std::io::Result<()> {
        out.write_all(self.render(outcome).as_bytes())?;
        out.flush()
    }

    fn paint(&self, text: &str, style: &Style) -> String {
        if self.colors {
            style.clone().force_styling(true).apply_to(text).to_string()
        } else {
            text.to_string()
        }
    }
}

fn numbered_list(title: &str, records: &[Diagnostic]) -> String {
    let mut out = format!("The following {} were found:\n", title);
    for (i, record) in records.iter().enumerate() {
        out.push_str(&format!("{}. {}\n", i + 1, record));
    }
    out
}

/// Write the outcome as pretty JSON.
pub fn write_outcome_json(path: &Path, outcome: &RunOutcome) -> Result<()> {
    let content = serde_json::to_string_pretty(outcome)?;
    std::fs::write(path, content).map_err(|source| BuildError::Report {
        path: path.to_path_buf(),
        source,
    })
}
