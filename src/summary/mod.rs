//! Per-file level summary of the log directory
//!
//! Scans the log files, counts `ERROR` / `INFO` / `WARN` lines in each and merges
//! the counts into a persisted JSON document.

mod store;
mod updater;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

pub use store::SummaryStore;
pub use updater::{update_summary_file, SummaryUpdater};

/// Markers searched for in each line, matched as plain substrings
pub const ERROR_MARKER: &str = "ERROR";
pub const INFO_MARKER: &str = "INFO";
pub const WARN_MARKER: &str = "WARN";

/// Level counts for the content of one log file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LevelCounts {
    pub errors: u64,
    pub info: u64,
    pub warn: u64,
    pub total: u64,
}

/// Count marker occurrences over the non-blank lines of `content`
///
/// A line containing several markers counts once for each of them.
pub fn count_levels(content: &str) -> LevelCounts {
    let mut counts = LevelCounts::default();

    for line in content.lines().filter(|l| !l.trim().is_empty()) {
        if line.contains(ERROR_MARKER) {
            counts.errors += 1;
        }
        if line.contains(INFO_MARKER) {
            counts.info += 1;
        }
        if line.contains(WARN_MARKER) {
            counts.warn += 1;
        }
        counts.total += 1;
    }

    counts
}

/// Counters written as `null` by older summaries load as 0
fn null_as_zero<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<u64>::deserialize(deserializer)?.unwrap_or_default())
}

/// Summary entry for a single log file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileSummary {
    pub filename: String,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub errors: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub info: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub warn: u64,
    #[serde(default, deserialize_with = "null_as_zero")]
    pub total: u64,
}

impl FileSummary {
    pub fn new(filename: impl Into<String>, counts: LevelCounts) -> Self {
        Self {
            filename: filename.into(),
            errors: counts.errors,
            info: counts.info,
            warn: counts.warn,
            total: counts.total,
        }
    }

    /// Overwrite all four counters
    pub fn set_counts(&mut self, counts: LevelCounts) {
        self.errors = counts.errors;
        self.info = counts.info;
        self.warn = counts.warn;
        self.total = counts.total;
    }
}

/// The persisted summary of every log file seen so far
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SummaryDocument {
    pub updated_at: DateTime<Utc>,
    #[serde(default)]
    pub logs: Vec<FileSummary>,
}

impl Default for SummaryDocument {
    fn default() -> Self {
        Self::new()
    }
}

impl SummaryDocument {
    /// Empty document stamped with the current time
    pub fn new() -> Self {
        Self {
            updated_at: Utc::now(),
            logs: Vec::new(),
        }
    }

    /// Look up the entry for `filename`
    pub fn get(&self, filename: &str) -> Option<&FileSummary> {
        self.logs.iter().find(|s| s.filename == filename)
    }

    /// Merge fresh counts for `filename`
    ///
    /// A known file whose total is unchanged is left alone. Otherwise the entry is
    /// created, or its counters are overwritten. Returns whether anything changed.
    pub fn merge(&mut self, filename: &str, counts: LevelCounts) -> bool {
        match self.logs.iter_mut().find(|s| s.filename == filename) {
            Some(existing) if existing.total == counts.total => false,
            Some(existing) => {
                existing.set_counts(counts);
                true
            }
            None => {
                self.logs.push(FileSummary::new(filename, counts));
                true
            }
        }
    }

    /// Stamp the document with the current time
    pub fn touch(&mut self) {
        self.updated_at = Utc::now();
    }
}
