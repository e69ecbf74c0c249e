//! nbuild core library
//!
//! Wraps one Ninja build invocation and turns its console output into:
//! - a live `[####   ] NN.NN%` progress line
//! - a timestamped raw output log
//! - a deduplicated list of warnings, compile errors and link errors
//! - a success verdict derived from those diagnostics

pub mod build_log;
pub mod classifier;
pub mod config;
pub mod configure;
pub mod coordinator;
pub mod diagnostic;
pub mod error;
pub mod progress;
pub mod reporter;
pub mod run;
pub mod telemetry;

pub use build_log::BuildLog;
pub use classifier::{classify_line, Classifier, DiagnosticPattern, FieldMapping};
pub use config::{
    default_jobs, BuildConfig, BuildTool, BuildType, RunMode, VerdictPolicy, DEFAULT_LOG_FILE,
};
pub use configure::ConfigureStep;
pub use coordinator::BuildCoordinator;
pub use diagnostic::{Diagnostic, DiagnosticKind, DiagnosticSet, Location};
pub use error::{BuildError, Result};
pub use progress::{
    NullProgress, ProgressSink, ProgressState, ProgressTracker, TerminalProgress, BAR_WIDTH,
};
pub use reporter::{write_outcome_json, Reporter};
pub use run::{RunContext, RunOutcome};
pub use telemetry::init_tracing;

/// nbuild version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
