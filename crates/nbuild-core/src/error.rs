//! Fatal error taxonomy for a build run.
//!
//! A failed build is not an error: it is a [`RunOutcome`](crate::RunOutcome)
//! whose `succeeded` flag is false. Every variant here means the run could
//! not be completed at all.

use std::path::PathBuf;

/// Errors that abort a build run.
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("invalid build configuration: {0}")]
    InvalidConfig(String),

    #[error("failed to launch `{program}`: {source}")]
    Launch {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("configure step exited with {}", code.map_or_else(|| "a signal".to_string(), |c| format!("code {c}")))]
    ConfigureFailed { code: Option<i32> },

    #[error("failed to read build output: {0}")]
    Stream(#[source] std::io::Error),

    #[error("failed to write build log {path:?}: {source}")]
    Log {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to write report {path:?}: {source}")]
    Report {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("build run cancelled")]
    Cancelled,

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for build run operations.
pub type Result<T> = std::result::Result<T, BuildError>;
