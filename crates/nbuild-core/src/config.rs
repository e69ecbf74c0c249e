//! Build run configuration.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{BuildError, Result};

/// Default log file name, relative to the working directory.
pub const DEFAULT_LOG_FILE: &str = "Compilation.log";

/// Default build program.
pub const DEFAULT_BUILD_PROGRAM: &str = "ninja";

/// CMake build type passed to the configure step.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BuildType {
    Debug,
    #[default]
    Release,
}

impl BuildType {
    /// Name as understood by `CMAKE_BUILD_TYPE`.
    pub fn as_str(&self) -> &'static str {
        match self {
            BuildType::Debug => "Debug",
            BuildType::Release => "Release",
        }
    }
}

impl fmt::Display for BuildType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BuildType {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "debug" => Ok(BuildType::Debug),
            "release" => Ok(BuildType::Release),
            other => Err(BuildError::InvalidConfig(format!(
                "unknown build type '{}' (expected Debug or Release)",
                other
            ))),
        }
    }
}

/// How the run treats the build tool's output.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RunMode {
    /// Nothing is launched; the run succeeds immediately.
    DryRun,
    /// Output goes straight to the terminal; only the exit code is judged.
    Passthrough,
    /// Output is logged, tracked for progress and classified.
    Analyzed,
}

/// Which signals decide the verdict of an analyzed run.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum VerdictPolicy {
    /// Only error and link-error diagnostics fail the build.
    #[default]
    DiagnosticsOnly,
    /// A nonzero exit code also fails the build.
    IncludeExitCode,
}

/// The external build program and its arguments.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BuildTool {
    /// Executable name or path.
    pub program: String,

    /// Arguments passed verbatim.
    pub args: Vec<String>,
}

impl BuildTool {
    /// `ninja -j <jobs>`.
    pub fn ninja(jobs: usize) -> Self {
        Self {
            program: DEFAULT_BUILD_PROGRAM.to_string(),
            args: vec!["-j".to_string(), jobs.to_string()],
        }
    }

    /// Arbitrary program, e.g. a wrapper script or a fake tool in tests.
    pub fn custom(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    /// Command line for log messages.
    pub fn display(&self) -> String {
        if self.args.is_empty() {
            self.program.clone()
        } else {
            format!("{} {}", self.program, self.args.join(" "))
        }
    }
}

/// Resolved configuration for one build run. Immutable once the run starts.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct BuildConfig {
    pub build_type: BuildType,

    /// Parallel job count handed to the build tool.
    pub jobs: usize,

    /// Directory the build tool runs in.
    pub work_dir: PathBuf,

    /// Stream raw output and skip analysis.
    pub verbose: bool,

    /// Skip execution entirely.
    pub dry_run: bool,

    /// Log file; relative paths resolve against `work_dir`.
    pub log_path: PathBuf,

    /// Build tool override. `None` means `ninja -j <jobs>`.
    pub tool: Option<BuildTool>,

    pub verdict_policy: VerdictPolicy,
}

impl Default for BuildConfig {
    fn default() -> Self {
        Self {
            build_type: BuildType::default(),
            jobs: default_jobs(),
            work_dir: PathBuf::from("."),
            verbose: false,
            dry_run: false,
            log_path: PathBuf::from(DEFAULT_LOG_FILE),
            tool: None,
            verdict_policy: VerdictPolicy::default(),
        }
    }
}

impl BuildConfig {
    /// Configuration with defaults for everything but the build type.
    pub fn new(build_type: BuildType) -> Self {
        Self {
            build_type,
            ..Default::default()
        }
    }

    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs;
        self
    }

    pub fn with_work_dir(mut self, work_dir: impl Into<PathBuf>) -> Self {
        self.work_dir = work_dir.into();
        self
    }

    pub fn with_log_path(mut self, log_path: impl Into<PathBuf>) -> Self {
        self.log_path = log_path.into();
        self
    }

    pub fn with_tool(mut self, tool: BuildTool) -> Self {
        self.tool = Some(tool);
        self
    }

    pub fn with_verdict_policy(mut self, policy: VerdictPolicy) -> Self {
        self.verdict_policy = policy;
        self
    }

    /// Enable raw passthrough of build output.
    pub fn verbose(mut self) -> Self {
        self.verbose = true;
        self
    }

    /// Skip execution.
    pub fn dry_run(mut self) -> Self {
        self.dry_run = true;
        self
    }

    /// Dry run wins over verbose.
    pub fn mode(&self) -> RunMode {
        if self.dry_run {
            RunMode::DryRun
        } else if self.verbose {
            RunMode::Passthrough
        } else {
            RunMode::Analyzed
        }
    }

    /// The build tool invocation for this run.
    pub fn command(&self) -> BuildTool {
        self.tool
            .clone()
            .unwrap_or_else(|| BuildTool::ninja(self.jobs))
    }

    /// Absolute-or-work-dir-relative log path.
    pub fn resolved_log_path(&self) -> PathBuf {
        resolve_against(&self.work_dir, &self.log_path)
    }

    /// Reject configurations that cannot produce a run.
    pub fn validate(&self) -> Result<()> {
        if self.jobs == 0 {
            return Err(BuildError::InvalidConfig(
                "job count must be at least 1".to_string(),
            ));
        }
        if let Some(tool) = &self.tool {
            if tool.program.trim().is_empty() {
                return Err(BuildError::InvalidConfig(
                    "build tool program must not be empty".to_string(),
                ));
            }
        }
        if self.log_path.as_os_str().is_empty() {
            return Err(BuildError::InvalidConfig(
                "log path must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Host parallelism, falling back to a single job.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}

fn resolve_against(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_type_parse() {
        assert_eq!("Debug".parse::<BuildType>().unwrap(), BuildType::Debug);
        assert_eq!("release".parse::<BuildType>().unwrap(), BuildType::Release);
        assert!("RelWithDebInfo".parse::<BuildType>().is_err());
    }

    #[test]
    fn test_build_type_display() {
        assert_eq!(BuildType::Debug.to_string(), "Debug");
        assert_eq!(BuildType::Release.to_string(), "Release");
    }

    #[test]
    fn test_default_config() {
        let config = BuildConfig::default();
        assert_eq!(config.build_type, BuildType::Release);
        assert!(config.jobs >= 1);
        assert_eq!(config.log_path, PathBuf::from(DEFAULT_LOG_FILE));
        assert_eq!(config.verdict_policy, VerdictPolicy::DiagnosticsOnly);
        assert_eq!(config.mode(), RunMode::Analyzed);
    }

    #[test]
    fn test_mode_precedence() {
        let config = BuildConfig::new(BuildType::Debug).verbose();
        assert_eq!(config.mode(), RunMode::Passthrough);

        let config = BuildConfig::new(BuildType::Debug).verbose().dry_run();
        assert_eq!(config.mode(), RunMode::DryRun);
    }

    #[test]
    fn test_default_command_is_ninja_with_jobs() {
        let config = BuildConfig::new(BuildType::Release).with_jobs(6);
        let tool = config.command();
        assert_eq!(tool.program, "ninja");
        assert_eq!(tool.args, vec!["-j".to_string(), "6".to_string()]);
        assert_eq!(tool.display(), "ninja -j 6");
    }

    #[test]
    fn test_custom_tool_overrides_ninja() {
        let config = BuildConfig::default()
            .with_tool(BuildTool::custom("make", vec!["all".to_string()]));
        assert_eq!(config.command().program, "make");
    }

    #[test]
    fn test_log_path_resolves_against_work_dir() {
        let config = BuildConfig::default().with_work_dir("/tmp/build");
        assert_eq!(
            config.resolved_log_path(),
            PathBuf::from("/tmp/build/Compilation.log")
        );

        let config = config.with_log_path("/var/log/build.log");
        assert_eq!(
            config.resolved_log_path(),
            PathBuf::from("/var/log/build.log")
        );
    }

    #[test]
    fn test_validate_rejects_zero_jobs() {
        let err = BuildConfig::default().with_jobs(0).validate().unwrap_err();
        assert!(err.to_string().contains("job count"));
    }

    #[test]
    fn test_validate_rejects_empty_program() {
        let config = BuildConfig::default().with_tool(BuildTool::custom("  ", vec![]));
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_accepts_defaults() {
        assert!(BuildConfig::default().validate().is_ok());
    }
}
