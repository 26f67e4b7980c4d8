//! Log writer
//!
//! Formats leveled messages as `YYYY-MM-DD HH:mm:ss LEVEL: message` and appends them
//! to daily rotating files. Failures are reported through `tracing` and never reach
//! the caller.

mod level;
mod retention;
mod rotating;

use std::path::PathBuf;
use std::sync::Mutex;

use chrono::{Local, NaiveDateTime};

use crate::config::Config;

pub use level::{Level, UnknownLevel};
pub use retention::cleanup_old_logs;
pub use rotating::{
    log_file_path, parse_log_file_name, RotatingFile, RotationPolicy, DATE_PATTERN,
};

/// Extension shared by every log file and the summary document
pub const LOG_EXTENSION: &str = "log";

/// Timestamp format at the start of each line
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Whether `name` is a `.log` file the summary should scan
pub fn is_log_file_name(name: &str, summary_file: &str) -> bool {
    name != summary_file && name.ends_with(&format!(".{}", LOG_EXTENSION))
}

/// Render one log line
pub fn format_line(timestamp: NaiveDateTime, level: Level, message: &str) -> String {
    format!(
        "{} {}: {}",
        timestamp.format(TIMESTAMP_FORMAT),
        level.as_str(),
        message
    )
}

/// Leveled logger writing to daily rotating files
pub struct Logger {
    threshold: Level,
    sink: Mutex<RotatingFile>,
}

impl Logger {
    /// Create a logger writing into `logs_dir` with the given policy and minimum level
    pub fn new(logs_dir: PathBuf, policy: RotationPolicy, threshold: Level) -> Self {
        Self {
            threshold,
            sink: Mutex::new(RotatingFile::new(logs_dir, policy)),
        }
    }

    /// Create a logger from the application configuration
    pub fn from_config(config: &Config) -> Self {
        let policy = RotationPolicy {
            max_file_size: config.max_file_size,
            retention_days: config.retention_days,
            summary_file: config.summary_file.clone(),
        };
        Self::new(config.logs_dir.clone(), policy, config.level)
    }

    /// Least severe level this logger keeps
    pub fn threshold(&self) -> Level {
        self.threshold
    }

    /// Log a message at `level`
    pub fn log(&self, message: &str, level: Level) {
        self.log_at(Local::now().naive_local(), message, level);
    }

    /// Log a message at `info`
    pub fn info(&self, message: &str) {
        self.log(message, Level::Info);
    }

    /// Log a message at `warn`
    pub fn warn(&self, message: &str) {
        self.log(message, Level::Warn);
    }

    /// Log a message at `error`
    pub fn error(&self, message: &str) {
        self.log(message, Level::Error);
    }

    /// Log a message with a textual level name; unknown names drop the message
    pub fn log_str(&self, message: &str, level: &str) {
        match level.parse::<Level>() {
            Ok(level) => self.log(message, level),
            Err(e) => tracing::warn!("Dropping log message: {}", e),
        }
    }

    fn log_at(&self, timestamp: NaiveDateTime, message: &str, level: Level) {
        if !level.passes(self.threshold) {
            return;
        }

        let line = format_line(timestamp, level, message);
        let Ok(mut sink) = self.sink.lock() else {
            tracing::error!("Log writer lock poisoned, dropping message");
            return;
        };
        if let Err(e) = sink.write_line_on(timestamp.date(), &line) {
            tracing::error!("Failed to write log line: {:#}", e);
        }
    }
}

impl Drop for Logger {
    fn drop(&mut self) {
        if let Ok(sink) = self.sink.get_mut() {
            let _ = sink.flush();
        }
    }
}
