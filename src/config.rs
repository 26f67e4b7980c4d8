//! Configuration management for logtally

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::writer::Level;

/// Name of the optional config file, looked up in the working directory
pub const CONFIG_FILE_NAME: &str = "logtally.toml";

/// Categories of disk errors for user-friendly messages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiskErrorKind {
    /// Disk is full or quota exceeded
    DiskFull,
    /// Permission denied (read or write)
    PermissionDenied,
    /// File or directory not found
    NotFound,
    /// Other IO error
    Other,
}

impl DiskErrorKind {
    /// Get a user-friendly message for this error kind
    pub fn user_message(&self) -> &'static str {
        match self {
            DiskErrorKind::DiskFull => "disk full",
            DiskErrorKind::PermissionDenied => "permission denied",
            DiskErrorKind::NotFound => "file or directory not found",
            DiskErrorKind::Other => "I/O error",
        }
    }
}

/// Categorize an IO error into a user-friendly category
pub fn categorize_io_error(e: &std::io::Error) -> DiskErrorKind {
    use std::io::ErrorKind;

    match e.kind() {
        ErrorKind::StorageFull | ErrorKind::WriteZero => DiskErrorKind::DiskFull,
        ErrorKind::PermissionDenied => DiskErrorKind::PermissionDenied,
        ErrorKind::NotFound => DiskErrorKind::NotFound,
        _ => {
            #[cfg(unix)]
            {
                if let Some(os_error) = e.raw_os_error() {
                    // ENOSPC = 28, EDQUOT = 122 on Linux / 69 on macOS
                    if os_error == 28 || os_error == 122 || os_error == 69 {
                        return DiskErrorKind::DiskFull;
                    }
                    // EACCES
                    if os_error == 13 {
                        return DiskErrorKind::PermissionDenied;
                    }
                }
            }
            DiskErrorKind::Other
        }
    }
}

/// Create a user-friendly error message from an IO error
pub fn friendly_io_error_message(e: &std::io::Error, context: &str) -> String {
    match categorize_io_error(e) {
        DiskErrorKind::Other => format!("{}: {}", context, e),
        kind => format!("{}: {}", context, kind.user_message()),
    }
}

/// Application configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the daily log files and the summary document
    #[serde(default = "default_logs_dir")]
    pub logs_dir: PathBuf,

    /// File name of the summary document inside `logs_dir`
    #[serde(default = "default_summary_file")]
    pub summary_file: String,

    /// Size ceiling in bytes for a single log file before an overflow file is opened (default: 20 MiB)
    #[serde(default = "default_max_file_size")]
    pub max_file_size: u64,

    /// Log files older than this many days are deleted on rotation (default: 14)
    #[serde(default = "default_retention_days")]
    pub retention_days: u64,

    /// Least severe level the writer keeps (default: info)
    #[serde(default)]
    pub level: Level,
}

fn default_logs_dir() -> PathBuf {
    PathBuf::from("logs")
}

fn default_summary_file() -> String {
    "summary.log".to_string()
}

fn default_max_file_size() -> u64 {
    20 * 1024 * 1024
}

fn default_retention_days() -> u64 {
    14
}

impl Default for Config {
    fn default() -> Self {
        Self {
            logs_dir: default_logs_dir(),
            summary_file: default_summary_file(),
            max_file_size: default_max_file_size(),
            retention_days: default_retention_days(),
            level: Level::default(),
        }
    }
}

impl Config {
    /// Load configuration from `logtally.toml` in the working directory, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(Path::new(CONFIG_FILE_NAME))
    }

    /// Load configuration from a specific path, or return default if not found
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path).context("Failed to read config file")?;
            toml::from_str(&content).context("Failed to parse config file")
        } else {
            Ok(Self::default())
        }
    }

    /// Full path of the summary document
    pub fn summary_path(&self) -> PathBuf {
        self.logs_dir.join(&self.summary_file)
    }
}
