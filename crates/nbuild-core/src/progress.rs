//! Progress tracking from `[completed/total]` tokens and the progress line.

use indicatif::{ProgressBar, ProgressDrawTarget, ProgressStyle};
use regex::Regex;
use std::sync::LazyLock;
use tracing::trace;

/// Width of the rendered bar, excluding brackets.
pub const BAR_WIDTH: u64 = 50;

static PROGRESS_TOKEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\[(\d+)/(\d+)\]").expect("progress pattern compiles"));

/// Completed and total unit counts for one run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ProgressState {
    pub completed: u64,
    pub total: u64,
}

impl ProgressState {
    /// Percentage in `0.0..=100.0`; zero until a total is known.
    pub fn percent(&self) -> f64 {
        if self.total == 0 {
            return 0.0;
        }
        (self.completed as f64 / self.total as f64 * 100.0).min(100.0)
    }

    /// Number of filled bar cells, floored.
    pub fn filled(&self) -> u64 {
        if self.total == 0 {
            return 0;
        }
        (self.completed.saturating_mul(BAR_WIDTH) / self.total).min(BAR_WIDTH)
    }

    /// `[####      ] NN.NN% `
    pub fn render(&self) -> String {
        let filled = self.filled() as usize;
        let empty = BAR_WIDTH as usize - filled;
        format!(
            "[{}{}] {:.2}% ",
            "#".repeat(filled),
            " ".repeat(empty),
            self.percent()
        )
    }
}

/// Extract the first `[a/b]` token from a line.
pub fn parse_token(line: &str) -> Option<ProgressState> {
    let caps = PROGRESS_TOKEN.captures(line)?;
    let completed = caps[1].parse().ok()?;
    let total = caps[2].parse().ok()?;
    Some(ProgressState { completed, total })
}

/// Stateful progress parser for a single run.
///
/// The latest token wins, except that a token with the current total and a
/// smaller completed count is ignored, so the bar never moves backwards
/// within one build graph.
#[derive(Debug, Default)]
pub struct ProgressTracker {
    state: ProgressState,
}

impl ProgressTracker {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> ProgressState {
        self.state
    }

    /// Feed one line. Returns `true` when the state changed.
    pub fn observe(&mut self, line: &str) -> bool {
        let Some(token) = parse_token(line) else {
            return false;
        };
        if token.total == self.state.total && token.completed < self.state.completed {
            trace!(
                completed = token.completed,
                total = token.total,
                "ignoring regressing progress token"
            );
            return false;
        }
        let changed = token != self.state;
        self.state = token;
        changed
    }

    pub fn render(&self) -> String {
        self.state.render()
    }
}

/// Where the rendered progress line goes.
pub trait ProgressSink: Send + Sync {
    /// Replace the displayed line.
    fn update(&self, rendered: &str);

    /// Leave the final line in place.
    fn finish(&self);
}

/// Sink that discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullProgress;

impl ProgressSink for NullProgress {
    fn update(&self, _rendered: &str) {}

    fn finish(&self) {}
}

/// Overwritten terminal line drawn by indicatif. Hidden when stdout is not a
/// terminal.
pub struct TerminalProgress {
    bar: ProgressBar,
}

impl TerminalProgress {
    pub fn stdout() -> Self {
        Self::with_target(ProgressDrawTarget::stdout())
    }

    pub fn with_target(target: ProgressDrawTarget) -> Self {
        let bar = ProgressBar::with_draw_target(None, target);
        bar.set_style(ProgressStyle::with_template("{msg}").expect("valid template"));
        Self { bar }
    }
}

impl Default for TerminalProgress {
    fn default() -> Self {
        Self::stdout()
    }
}

impl ProgressSink for TerminalProgress {
    fn update(&self, rendered: &str) {
        self.bar.set_message(rendered.to_string());
    }

    fn finish(&self) {
        self.bar.finish();
    }
}
