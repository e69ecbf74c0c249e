//! nbuild - Ninja build front-end
//!
//! Configures the project with CMake, runs Ninja, shows a progress line and
//! prints a deduplicated diagnostics report.
//!
//! Exit codes:
//! - `0`: build succeeded
//! - `1`: build failed (compile or link errors)
//! - `2`: the build could not be completed (bad configuration, launch or
//!   I/O failure, cancellation)

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use console::style;
use nbuild_core::{
    default_jobs, write_outcome_json, BuildConfig, BuildCoordinator, BuildTool, BuildType,
    ConfigureStep, Reporter, RunMode, RunOutcome, VerdictPolicy, DEFAULT_LOG_FILE,
};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing::{debug, Level};

#[derive(Parser, Debug)]
#[command(name = "nbuild")]
#[command(author = "Stevedores Org")]
#[command(version = nbuild_core::VERSION)]
#[command(about = "Build with Ninja and report progress and diagnostics", long_about = None)]
struct Cli {
    /// Type of build (Debug or Release)
    #[arg(value_name = "BUILD_TYPE", default_value = "Release", env = "NBUILD_BUILD_TYPE")]
    build_type: BuildType,

    /// Number of parallel jobs (default: all available cores)
    #[arg(short, long, env = "NBUILD_JOBS")]
    jobs: Option<usize>,

    /// Stream raw build output; disables the progress bar and analysis
    #[arg(long)]
    verbose: bool,

    /// Resolve the configuration but do not configure or build
    #[arg(long)]
    dry_run: bool,

    /// Directory to perform the build in
    #[arg(long, default_value = ".", env = "NBUILD_BUILD_DIR")]
    build_dir: PathBuf,

    /// Build output log, relative to the build directory unless absolute
    #[arg(long, default_value = DEFAULT_LOG_FILE, env = "NBUILD_LOG_FILE")]
    log_file: PathBuf,

    /// Ninja-compatible build program
    #[arg(long, default_value = "ninja", env = "NBUILD_TOOL")]
    tool: String,

    /// Do not run the CMake configure step
    #[arg(long)]
    skip_configure: bool,

    /// Also fail the build when the build tool exits nonzero
    #[arg(long)]
    fail_on_exit_code: bool,

    /// Write the run outcome as JSON to this path
    #[arg(long, value_name = "PATH")]
    report_json: Option<PathBuf>,

    /// Emit JSON-formatted log lines
    #[arg(long)]
    json_logs: bool,

    /// Log level when RUST_LOG is not set
    #[arg(long, default_value = "warn", env = "NBUILD_LOG_LEVEL")]
    log_level: String,
}

impl Cli {
    /// Resolve flags into a build configuration rooted at `cwd`.
    fn build_config(&self, cwd: &Path) -> BuildConfig {
        let jobs = self.jobs.unwrap_or_else(default_jobs);
        let work_dir = if self.build_dir.is_absolute() {
            self.build_dir.clone()
        } else {
            cwd.join(&self.build_dir)
        };
        let policy = if self.fail_on_exit_code {
            VerdictPolicy::IncludeExitCode
        } else {
            VerdictPolicy::DiagnosticsOnly
        };

        let mut config = BuildConfig::new(self.build_type)
            .with_jobs(jobs)
            .with_work_dir(work_dir)
            .with_log_path(&self.log_file)
            .with_tool(BuildTool::custom(
                self.tool.clone(),
                vec!["-j".to_string(), jobs.to_string()],
            ))
            .with_verdict_policy(policy);
        if self.verbose {
            config = config.verbose();
        }
        if self.dry_run {
            config = config.dry_run();
        }
        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let level = nbuild_core::telemetry::parse_level(&cli.log_level).unwrap_or(Level::WARN);
    nbuild_core::init_tracing(cli.json_logs, level);

    let started = Instant::now();
    let code = match cmd_build(&cli).await {
        Ok(outcome) if outcome.succeeded => {
            status_ok("Successfully built the project.");
            ExitCode::SUCCESS
        }
        Ok(outcome) => {
            status_err(&format!(
                "Build failed: {}",
                outcome.failure_reasons().join(", ")
            ));
            ExitCode::from(1)
        }
        Err(err) => {
            status_err(&format!("could not complete build: {:#}", err));
            ExitCode::from(2)
        }
    };
    status_info(&format!(
        "Total time taken: {:.2}s",
        started.elapsed().as_secs_f64()
    ));
    code
}

async fn cmd_build(cli: &Cli) -> Result<RunOutcome> {
    let cwd = std::env::current_dir().context("Failed to resolve current directory")?;
    let config = cli.build_config(&cwd);

    status_info(&format!("Build type: {}", config.build_type));
    status_info(&format!("Number of jobs: {}", config.jobs));
    status_info(&format!("Verbose mode: {}", config.verbose));
    status_info(&format!("Dry run: {}", config.dry_run));
    status_info(&format!("Build directory: {}", config.work_dir.display()));

    config.validate().context("Invalid build configuration")?;

    if cli.skip_configure || config.dry_run {
        debug!("skipping configure step");
    } else {
        ConfigureStep::new(config.build_type, &cwd, &config.work_dir)
            .run()
            .await
            .context("CMake configuration failed")?;
        status_ok(&format!("Project configured for {}.", config.build_type));
    }

    status_process("Starting compilation.");
    let outcome = BuildCoordinator::new()
        .run(&config)
        .await
        .context("Build run aborted")?;

    match (summary_line(&outcome), outcome.mode, outcome.succeeded) {
        (Some(line), RunMode::DryRun, _) => status_warn(line),
        (Some(line), _, true) => status_ok(line),
        (Some(line), _, false) => status_err(line),
        (None, _, _) => {
            let mut stdout = std::io::stdout().lock();
            Reporter::for_terminal()
                .report(&outcome, &mut stdout)
                .context("Failed to print diagnostics report")?;
            status_info(&format!(
                "Build log written to {}",
                config.resolved_log_path().display()
            ));
        }
    }

    if let Some(path) = &cli.report_json {
        write_outcome_json(path, &outcome)
            .with_context(|| format!("Failed to write report {:?}", path))?;
        status_info(&format!("Report written to {}", path.display()));
    }

    Ok(outcome)
}

/// Status line for runs that have no diagnostics report.
fn summary_line(outcome: &RunOutcome) -> Option<&'static str> {
    match (outcome.mode, outcome.succeeded) {
        (RunMode::DryRun, _) => Some("Dry run: skipped actual compilation."),
        (RunMode::Passthrough, true) => Some("Compilation completed without analyzer."),
        (RunMode::Passthrough, false) => Some("Compilation failed without analyzer."),
        (RunMode::Analyzed, _) => None,
    }
}

fn stamp() -> String {
    Local::now().format("%H:%M:%S").to_string()
}

fn status_info(msg: &str) {
    println!("{}", style(format!("[{}] {}", stamp(), msg)).cyan());
}

fn status_ok(msg: &str) {
    println!("{}", style(format!("[{}] {}", stamp(), msg)).green());
}

fn status_warn(msg: &str) {
    println!("{}", style(format!("[{}] {}", stamp(), msg)).yellow());
}

fn status_process(msg: &str) {
    println!("{}", style(format!("[{}] {}", stamp(), msg)).blue());
}

fn status_err(msg: &str) {
    eprintln!("{}", style(format!("[{}] {}", stamp(), msg)).red());
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn parse(args: &[&str]) -> Cli {
        let mut argv = vec!["nbuild"];
        argv.extend_from_slice(args);
        Cli::try_parse_from(argv).expect("parse")
    }

    #[test]
    fn test_defaults() {
        let cli = parse(&[]);
        assert_eq!(cli.build_type, BuildType::Release);
        assert_eq!(cli.log_file, PathBuf::from("Compilation.log"));
        assert_eq!(cli.tool, "ninja");
        assert!(!cli.verbose);
        assert!(!cli.dry_run);
    }

    #[test]
    fn test_rejects_unknown_build_type() {
        assert!(Cli::try_parse_from(["nbuild", "Profile"]).is_err());
    }

    #[test]
    fn test_build_config_resolution() {
        let cli = parse(&["Debug", "-j", "3", "--build-dir", "out", "--verbose"]);
        let config = cli.build_config(Path::new("/src/app"));

        assert_eq!(config.build_type, BuildType::Debug);
        assert_eq!(config.jobs, 3);
        assert_eq!(config.work_dir, PathBuf::from("/src/app/out"));
        assert_eq!(config.mode(), RunMode::Passthrough);
        assert_eq!(config.command().display(), "ninja -j 3");
        assert_eq!(
            config.resolved_log_path(),
            PathBuf::from("/src/app/out/Compilation.log")
        );
    }

    #[test]
    fn test_fail_on_exit_code_sets_policy() {
        let config = parse(&["--fail-on-exit-code"]).build_config(Path::new("/src"));
        assert_eq!(config.verdict_policy, VerdictPolicy::IncludeExitCode);
    }

    #[test]
    fn test_dry_run_flag() {
        let config = parse(&["--dry-run", "--verbose"]).build_config(Path::new("/src"));
        assert_eq!(config.mode(), RunMode::DryRun);
    }

    #[test]
    fn test_absolute_build_dir_kept() {
        let config = parse(&["--build-dir", "/tmp/b"]).build_config(Path::new("/src"));
        assert_eq!(config.work_dir, PathBuf::from("/tmp/b"));
    }

    #[test]
    fn test_summary_line_follows_passthrough_verdict() {
        let ok = RunOutcome::passthrough(Some(0), Duration::ZERO);
        let failed = RunOutcome::passthrough(Some(2), Duration::ZERO);

        assert_eq!(
            summary_line(&ok),
            Some("Compilation completed without analyzer.")
        );
        assert_eq!(
            summary_line(&failed),
            Some("Compilation failed without analyzer.")
        );
        assert_eq!(
            summary_line(&RunOutcome::dry_run()),
            Some("Dry run: skipped actual compilation.")
        );
    }
}
