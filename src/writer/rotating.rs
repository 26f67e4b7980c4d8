//! Daily rotating file sink
//!
//! Keeps one open file per day (`YYYYMMDD.log`). When a file reaches the size
//! ceiling, writing moves on to `YYYYMMDD.1.log`, `YYYYMMDD.2.log` and so on.

use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::{Local, NaiveDate};

use super::{retention, LOG_EXTENSION};

/// Naming pattern for the date part of a log file name
pub const DATE_PATTERN: &str = "%Y%m%d";

/// Rotation and retention settings
#[derive(Debug, Clone)]
pub struct RotationPolicy {
    /// Size ceiling in bytes for a single file
    pub max_file_size: u64,
    /// Files older than this many days are removed when a new file is opened
    pub retention_days: u64,
    /// File name that retention must never remove
    pub summary_file: String,
}

/// Build the path of the `index`-th file for `date` (index 0 has no counter)
pub fn log_file_path(logs_dir: &Path, date: NaiveDate, index: u32) -> PathBuf {
    let stem = date.format(DATE_PATTERN);
    if index == 0 {
        logs_dir.join(format!("{}.{}", stem, LOG_EXTENSION))
    } else {
        logs_dir.join(format!("{}.{}.{}", stem, index, LOG_EXTENSION))
    }
}

/// Parse a name produced by [`log_file_path`] back into its date and index
pub fn parse_log_file_name(name: &str) -> Option<(NaiveDate, u32)> {
    let stem = name.strip_suffix(LOG_EXTENSION)?.strip_suffix('.')?;
    let (date_part, index) = match stem.split_once('.') {
        Some((date_part, index)) => {
            if index.is_empty() || !index.bytes().all(|b| b.is_ascii_digit()) {
                return None;
            }
            (date_part, index.parse().ok()?)
        }
        None => (stem, 0),
    };
    if date_part.len() != 8 || !date_part.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    let date = NaiveDate::parse_from_str(date_part, DATE_PATTERN).ok()?;
    Some((date, index))
}

struct ActiveFile {
    file: File,
    path: PathBuf,
    date: NaiveDate,
    index: u32,
    size: u64,
}

/// File sink that rotates on date change and on size overflow
pub struct RotatingFile {
    logs_dir: PathBuf,
    policy: RotationPolicy,
    active: Option<ActiveFile>,
}

impl RotatingFile {
    /// Create a sink writing into `logs_dir`; no file is opened until the first write
    pub fn new(logs_dir: PathBuf, policy: RotationPolicy) -> Self {
        Self {
            logs_dir,
            policy,
            active: None,
        }
    }

    /// Path of the currently open file, if any
    pub fn current_path(&self) -> Option<&Path> {
        self.active.as_ref().map(|a| a.path.as_path())
    }

    /// Append one already formatted line (without trailing newline) for today
    pub fn write_line(&mut self, line: &str) -> Result<()> {
        self.write_line_on(Local::now().date_naive(), line)
    }

    /// Append one line as if the current local date were `date`
    pub fn write_line_on(&mut self, date: NaiveDate, line: &str) -> Result<()> {
        let len = line.len() as u64 + 1;
        self.ensure_file(date, len)?;

        let Some(active) = self.active.as_mut() else {
            anyhow::bail!("No active log file");
        };
        active
            .file
            .write_all(format!("{}\n", line).as_bytes())
            .with_context(|| format!("Failed to write to {}", active.path.display()))?;
        active.size += len;
        Ok(())
    }

    /// Flush the active file
    pub fn flush(&mut self) -> Result<()> {
        if let Some(active) = self.active.as_mut() {
            active.file.flush().context("Failed to flush log file")?;
        }
        Ok(())
    }

    fn ensure_file(&mut self, date: NaiveDate, incoming: u64) -> Result<()> {
        let next_index = match &self.active {
            Some(a) if a.date == date => {
                // An empty file always takes the line, however long it is.
                if a.size == 0 || a.size + incoming <= self.policy.max_file_size {
                    return Ok(());
                }
                a.index + 1
            }
            _ => 0,
        };

        self.open(date, next_index, incoming)
    }

    fn open(&mut self, date: NaiveDate, mut index: u32, incoming: u64) -> Result<()> {
        fs::create_dir_all(&self.logs_dir).context("Failed to create logs directory")?;

        // Skip past files left over from an earlier run that are already full.
        let (path, size) = loop {
            let path = log_file_path(&self.logs_dir, date, index);
            let size = fs::metadata(&path).map(|m| m.len()).unwrap_or(0);
            if size == 0 || size + incoming <= self.policy.max_file_size {
                break (path, size);
            }
            index += 1;
        };

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("Failed to open log file {}", path.display()))?;

        tracing::debug!("Writing log lines to {}", path.display());

        self.active = Some(ActiveFile {
            file,
            path,
            date,
            index,
            size,
        });

        match retention::cleanup_old_logs(
            &self.logs_dir,
            self.policy.retention_days,
            &self.policy.summary_file,
        ) {
            Ok(count) if count > 0 => tracing::info!("Cleaned up {} old log files", count),
            Ok(_) => {}
            Err(e) => tracing::warn!("Log retention cleanup failed: {:#}", e),
        }

        Ok(())
    }
}
