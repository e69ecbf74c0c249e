//! Build run coordination.
//!
//! Launches the build tool for a [`BuildConfig`] and, depending on the run
//! mode, either streams its output untouched or pipes every line through the
//! log, the progress tracker and the classifier.

use std::future::Future;
use std::pin::Pin;
use std::process::Stdio;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, info, warn};

use crate::build_log::BuildLog;
use crate::classifier::Classifier;
use crate::config::{BuildConfig, BuildTool, RunMode};
use crate::error::{BuildError, Result};
use crate::progress::{NullProgress, ProgressSink, TerminalProgress};
use crate::run::{RunContext, RunOutcome};

/// Newline-delimited reader that tolerates non-UTF-8 output.
///
/// The partial-line buffer lives across calls, so `next_line` can be
/// dropped inside `select!` without losing bytes.
struct LineReader<R> {
    inner: BufReader<R>,
    buf: Vec<u8>,
}

impl<R: AsyncRead + Unpin> LineReader<R> {
    fn new(inner: R) -> Self {
        Self {
            inner: BufReader::new(inner),
            buf: Vec::new(),
        }
    }

    async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        let read = self.inner.read_until(b'\n', &mut self.buf).await?;
        if read == 0 && self.buf.is_empty() {
            return Ok(None);
        }
        let bytes = std::mem::take(&mut self.buf);
        let line = String::from_utf8_lossy(&bytes);
        Ok(Some(line.trim_end_matches(['\n', '\r']).to_string()))
    }
}

/// Runs one build at a time. Holds no per-run state.
pub struct BuildCoordinator {
    classifier: Classifier,
    progress: Arc<dyn ProgressSink>,
}

impl Default for BuildCoordinator {
    fn default() -> Self {
        Self::new()
    }
}

impl BuildCoordinator {
    /// Builtin classifier, progress drawn on stdout.
    pub fn new() -> Self {
        Self {
            classifier: Classifier::default(),
            progress: Arc::new(TerminalProgress::stdout()),
        }
    }

    /// No progress output at all.
    pub fn quiet() -> Self {
        Self::new().with_progress(Arc::new(NullProgress))
    }

    pub fn with_classifier(mut self, classifier: Classifier) -> Self {
        self.classifier = classifier;
        self
    }

    pub fn with_progress(mut self, progress: Arc<dyn ProgressSink>) -> Self {
        self.progress = progress;
        self
    }

    /// Run the build, cancelling on Ctrl-C.
    pub async fn run(&self, config: &BuildConfig) -> Result<RunOutcome> {
        self.run_until(config, ctrl_c()).await
    }

    /// Run the build, cancelling when `cancel` resolves.
    ///
    /// Returns `Ok` for every run that completed, including failed builds.
    /// `Err` means the run itself could not be completed.
    pub async fn run_until<F>(&self, config: &BuildConfig, cancel: F) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        config.validate()?;
        let mode = config.mode();
        info!(
            mode = ?mode,
            build_type = %config.build_type,
            jobs = config.jobs,
            work_dir = ?config.work_dir,
            "starting build run"
        );

        let outcome = match mode {
            RunMode::DryRun => {
                info!("dry run, skipping build tool");
                RunOutcome::dry_run()
            }
            RunMode::Passthrough => self.run_passthrough(config, cancel).await?,
            RunMode::Analyzed => self.run_analyzed(config, cancel).await?,
        };

        info!(
            succeeded = outcome.succeeded,
            exit_code = ?outcome.exit_code,
            duration_ms = outcome.duration_ms,
            "build run finished"
        );
        Ok(outcome)
    }

    async fn run_passthrough<F>(&self, config: &BuildConfig, cancel: F) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let tool = config.command();
        let mut child = spawn(&tool, config, Stdio::inherit)?;

        tokio::pin!(cancel);
        let status = tokio::select! {
            _ = &mut cancel => {
                terminate(&mut child).await;
                return Err(BuildError::Cancelled);
            }
            status = child.wait() => status.map_err(BuildError::Stream)?,
        };

        Ok(RunOutcome::passthrough(status.code(), start.elapsed()))
    }

    async fn run_analyzed<F>(&self, config: &BuildConfig, cancel: F) -> Result<RunOutcome>
    where
        F: Future<Output = ()>,
    {
        let start = Instant::now();
        let mut log = BuildLog::create(config.resolved_log_path()).await?;
        debug!(log = ?log.path(), "build log opened");

        let tool = config.command();
        let mut child = match spawn(&tool, config, Stdio::piped) {
            Ok(child) => child,
            Err(err) => {
                close_log(log).await;
                return Err(err);
            }
        };

        let mut ctx = RunContext::new(self.classifier.clone());
        self.progress.update(&ctx.render_progress());

        tokio::pin!(cancel);
        let pumped = match (child.stdout.take(), child.stderr.take()) {
            (Some(stdout), Some(stderr)) => {
                self.pump(stdout, stderr, &mut ctx, &mut log, cancel.as_mut())
                    .await
            }
            _ => Err(BuildError::Stream(std::io::Error::other(
                "build output was not captured",
            ))),
        };
        self.progress.finish();

        if let Err(err) = pumped {
            warn!(error = %err, lines = log.lines(), "aborting build run");
            return Err(abort(child, log, err).await);
        }

        // Output is closed but the tool may still be running.
        let waited = tokio::select! {
            _ = cancel.as_mut() => Err(BuildError::Cancelled),
            status = child.wait() => status.map_err(BuildError::Stream),
        };
        let status = match waited {
            Ok(status) => status,
            Err(err) => {
                warn!(error = %err, "aborting build run after output closed");
                return Err(abort(child, log, err).await);
            }
        };
        debug!(
            lines = log.lines(),
            duplicates = ctx.duplicates(),
            code = ?status.code(),
            "build tool exited"
        );
        log.close().await?;

        Ok(ctx.finish(status.code(), config.verdict_policy, start.elapsed()))
    }

    /// Read both streams to end-of-stream, handling lines in arrival order.
    async fn pump<O, E, F>(
        &self,
        stdout: O,
        stderr: E,
        ctx: &mut RunContext,
        log: &mut BuildLog,
        mut cancel: Pin<&mut F>,
    ) -> Result<()>
    where
        O: AsyncRead + Unpin,
        E: AsyncRead + Unpin,
        F: Future<Output = ()>,
    {
        let mut out = LineReader::new(stdout);
        let mut err = LineReader::new(stderr);
        let (mut out_open, mut err_open) = (true, true);

        while out_open || err_open {
            let line = tokio::select! {
                _ = cancel.as_mut() => return Err(BuildError::Cancelled),
                read = out.next_line(), if out_open => match read.map_err(BuildError::Stream)? {
                    Some(line) => line,
                    None => {
                        out_open = false;
                        continue;
                    }
                },
                read = err.next_line(), if err_open => match read.map_err(BuildError::Stream)? {
                    Some(line) => line,
                    None => {
                        err_open = false;
                        continue;
                    }
                },
            };

            log.append(&line).await?;
            if let Some(kind) = ctx.observe_line(&line) {
                if kind.is_failure() {
                    debug!(kind = ?kind, line = %line, "failure diagnostic");
                }
            }
            self.progress.update(&ctx.render_progress());
        }
        Ok(())
    }
}

fn spawn(tool: &BuildTool, config: &BuildConfig, output: fn() -> Stdio) -> Result<Child> {
    debug!(command = %tool.display(), "launching build tool");
    Command::new(&tool.program)
        .args(&tool.args)
        .current_dir(&config.work_dir)
        .stdin(Stdio::null())
        .stdout(output())
        .stderr(output())
        .kill_on_drop(true)
        .spawn()
        .map_err(|source| BuildError::Launch {
            program: tool.program.clone(),
            source,
        })
}

/// Kill and reap the child.
async fn terminate(child: &mut Child) {
    if let Err(err) = child.kill().await {
        warn!(error = %err, "failed to terminate build tool");
    }
}

/// Kill the tool, close the log and hand back the error that aborted the run.
async fn abort(mut child: Child, log: BuildLog, err: BuildError) -> BuildError {
    terminate(&mut child).await;
    close_log(log).await;
    err
}

/// Close the log on an error path; the caller's error is returned instead.
async fn close_log(log: BuildLog) {
    if let Err(err) = log.close().await {
        warn!(error = %err, "failed to close build log");
    }
}

async fn ctrl_c() {
    if tokio::signal::ctrl_c().await.is_err() {
        // No signal handler available: never cancel.
        std::future::pending::<()>().await;
    }
}
