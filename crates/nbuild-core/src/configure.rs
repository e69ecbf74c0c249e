//! CMake configure step that generates the Ninja build files.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

use crate::config::BuildType;
use crate::error::{BuildError, Result};

/// `cmake -G Ninja -DCMAKE_BUILD_TYPE=<type> <source_dir>` run in `build_dir`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigureStep {
    pub program: String,
    pub generator: String,
    pub build_type: BuildType,
    pub source_dir: PathBuf,
    pub build_dir: PathBuf,
}

impl ConfigureStep {
    pub fn new(build_type: BuildType, source_dir: impl Into<PathBuf>, build_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: "cmake".to_string(),
            generator: "Ninja".to_string(),
            build_type,
            source_dir: source_dir.into(),
            build_dir: build_dir.into(),
        }
    }

    /// Use a different cmake binary.
    pub fn with_program(mut self, program: impl Into<String>) -> Self {
        self.program = program.into();
        self
    }

    pub fn args(&self) -> Vec<String> {
        vec![
            "-G".to_string(),
            self.generator.clone(),
            format!("-DCMAKE_BUILD_TYPE={}", self.build_type),
            self.source_dir.to_string_lossy().into_owned(),
        ]
    }

    /// Create the build directory if needed and run cmake with inherited output.
    pub async fn run(&self) -> Result<()> {
        ensure_dir(&self.build_dir).await?;

        debug!(program = %self.program, args = ?self.args(), "running configure step");
        let status = Command::new(&self.program)
            .args(self.args())
            .current_dir(&self.build_dir)
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .status()
            .await
            .map_err(|source| BuildError::Launch {
                program: self.program.clone(),
                source,
            })?;

        if !status.success() {
            return Err(BuildError::ConfigureFailed {
                code: status.code(),
            });
        }
        info!(build_type = %self.build_type, build_dir = ?self.build_dir, "project configured");
        Ok(())
    }
}

async fn ensure_dir(dir: &Path) -> Result<()> {
    if tokio::fs::metadata(dir).await.is_err() {
        info!(dir = ?dir, "creating build directory");
        tokio::fs::create_dir_all(dir).await?;
    }
    Ok(())
}
