//! Timestamped raw output log.
//!
//! Every captured line is written as `YYYY-MM-DD HH:MM:SS - <line>` and
//! flushed immediately, so the file stays complete even if the run is
//! aborted or the process is killed.

use chrono::Local;
use std::path::{Path, PathBuf};
use tokio::fs::File;
use tokio::io::{AsyncWriteExt, BufWriter};

use crate::error::{BuildError, Result};

/// `strftime` format of the per-line prefix.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Separator between timestamp and line.
pub const SEPARATOR: &str = " - ";

/// Append-only log for one run.
pub struct BuildLog {
    path: PathBuf,
    writer: BufWriter<File>,
    lines: u64,
}

impl BuildLog {
    /// Create (or truncate) the log file, creating parent directories.
    pub async fn create(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|source| log_error(&path, source))?;
        }
        let file = File::create(&path)
            .await
            .map_err(|source| log_error(&path, source))?;
        Ok(Self {
            path,
            writer: BufWriter::new(file),
            lines: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lines written so far.
    pub fn lines(&self) -> u64 {
        self.lines
    }

    /// Write one timestamped line and flush it to disk.
    pub async fn append(&mut self, line: &str) -> Result<()> {
        let stamped = format!(
            "{}{}{}\n",
            Local::now().format(TIMESTAMP_FORMAT),
            SEPARATOR,
            line
        );
        self.writer
            .write_all(stamped.as_bytes())
            .await
            .map_err(|source| log_error(&self.path, source))?;
        self.writer
            .flush()
            .await
            .map_err(|source| log_error(&self.path, source))?;
        self.lines += 1;
        Ok(())
    }

    /// Flush and close the file.
    pub async fn close(mut self) -> Result<()> {
        self.writer
            .shutdown()
            .await
            .map_err(|source| log_error(&self.path, source))
    }
}

fn log_error(path: &Path, source: std::io::Error) -> BuildError {
    BuildError::Log {
        path: path.to_path_buf(),
        source,
    }
}

/// Split a log line into its timestamp and the captured text.
pub fn split_line(logged: &str) -> Option<(&str, &str)> {
    let (stamp, rest) = logged.split_once(SEPARATOR)?;
    chrono::NaiveDateTime::parse_from_str(stamp, TIMESTAMP_FORMAT).ok()?;
    Some((stamp, rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_lines_are_timestamped_in_order() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("Compilation.log");

        let mut log = BuildLog::create(&path).await.expect("create");
        log.append("[1/2] compiling a.c").await.expect("append");
        log.append("a.c:1:1: warning: w").await.expect("append");
        assert_eq!(log.lines(), 2);
        log.close().await.expect("close");

        let content = std::fs::read_to_string(&path).expect("read");
        let captured: Vec<&str> = content
            .lines()
            .map(|l| split_line(l).expect("well-formed line").1)
            .collect();
        assert_eq!(captured, vec!["[1/2] compiling a.c", "a.c:1:1: warning: w"]);
    }

    #[tokio::test]
    async fn test_create_truncates_previous_log() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("build.log");
        std::fs::write(&path, "stale line\n").expect("seed");

        let log = BuildLog::create(&path).await.expect("create");
        log.close().await.expect("close");

        assert_eq!(std::fs::read_to_string(&path).expect("read"), "");
    }

    #[tokio::test]
    async fn test_create_makes_parent_dirs() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("logs/nested/build.log");
        let log = BuildLog::create(&path).await.expect("create");
        assert_eq!(log.path(), path.as_path());
        log.close().await.expect("close");
        assert!(path.exists());
    }

    #[tokio::test]
    async fn test_flushed_without_close() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("build.log");
        let mut log = BuildLog::create(&path).await.expect("create");
        log.append("visible before close").await.expect("append");

        let content = std::fs::read_to_string(&path).expect("read");
        assert!(content.contains("visible before close"));
        drop(log);
    }

    #[test]
    fn test_split_line_rejects_malformed_stamp() {
        assert!(split_line("2024-01-01 10:00:00 - ok").is_some());
        assert!(split_line("yesterday - nope").is_none());
        assert!(split_line("no separator").is_none());
    }
}
