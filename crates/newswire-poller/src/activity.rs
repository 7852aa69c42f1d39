//! Bounded recent-activity log.
//!
//! Records the last symbols that actually received new stored rows, one
//! line per event, in a flat file suitable for a status display. The file
//! is rewritten on every record so it never grows past the cap.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::queue::QueueError;

const DEFAULT_CAPACITY: usize = 100;

/// Append-style activity log truncated to the most recent entries.
#[derive(Debug)]
pub struct ActivityLog {
    path: PathBuf,
    capacity: usize,
}

impl ActivityLog {
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            capacity: DEFAULT_CAPACITY,
        }
    }

    #[must_use]
    pub fn with_capacity(path: impl Into<PathBuf>, capacity: usize) -> Self {
        Self {
            path: path.into(),
            capacity,
        }
    }

    /// Records that `symbol` received `new_rows` freshly stored rows.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] if the log file cannot be read or
    /// rewritten.
    pub fn record(&self, symbol: &str, new_rows: u64) -> Result<(), QueueError> {
        let mut lines = self.tail(self.capacity)?;
        lines.push(format!(
            "{}\t{}\t{}",
            Utc::now().format("%Y-%m-%dT%H:%M:%SZ"),
            symbol,
            new_rows
        ));
        if lines.len() > self.capacity {
            let excess = lines.len() - self.capacity;
            lines.drain(..excess);
        }

        let io_err = |e: std::io::Error| QueueError::Io {
            path: self.path.display().to_string(),
            source: e,
        };
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(io_err)?;
            }
        }
        let tmp = self.path.with_extension("tmp");
        fs::write(&tmp, lines.join("\n") + "\n").map_err(io_err)?;
        fs::rename(&tmp, &self.path).map_err(io_err)?;
        Ok(())
    }

    /// Returns up to the last `n` recorded lines, oldest first. A missing
    /// file reads as empty.
    ///
    /// # Errors
    ///
    /// Returns [`QueueError::Io`] if the file exists but cannot be read.
    pub fn tail(&self, n: usize) -> Result<Vec<String>, QueueError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(QueueError::Io {
                    path: self.path.display().to_string(),
                    source: e,
                })
            }
        };
        let lines: Vec<String> = raw.lines().map(str::to_string).collect();
        let start = lines.len().saturating_sub(n);
        Ok(lines[start..].to_vec())
    }

    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tail_of_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::new(dir.path().join("activity.log"));
        assert!(log.tail(10).unwrap().is_empty());
    }

    #[test]
    fn record_appends_and_tail_returns_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::new(dir.path().join("activity.log"));

        log.record("AAPL", 3).unwrap();
        log.record("MSFT", 1).unwrap();

        let lines = log.tail(1).unwrap();
        assert_eq!(lines.len(), 1);
        assert!(lines[0].contains("MSFT"));
    }

    #[test]
    fn log_never_grows_past_capacity() {
        let dir = tempfile::tempdir().unwrap();
        let log = ActivityLog::with_capacity(dir.path().join("activity.log"), 3);

        for i in 0..10 {
            log.record(&format!("SYM{i}"), 1).unwrap();
        }

        let lines = log.tail(100).unwrap();
        assert_eq!(lines.len(), 3);
        assert!(lines[0].contains("SYM7"));
        assert!(lines[2].contains("SYM9"));
    }
}
