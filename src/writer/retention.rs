//! Log file retention management
//!
//! Handles cleanup of old log files based on age.

use std::fs;
use std::path::Path;
use std::time::{Duration, SystemTime};

use anyhow::Result;

use super::{is_log_file_name, parse_log_file_name};

/// Clean up log files older than the specified number of days
///
/// Only files named like the writer's own output (`YYYYMMDD.log`, `YYYYMMDD.<n>.log`)
/// are considered, and the summary document is never removed.
/// Returns the number of files deleted.
pub fn cleanup_old_logs(
    logs_dir: &Path,
    retention_days: u64,
    summary_file: &str,
) -> Result<usize> {
    if !logs_dir.exists() {
        return Ok(0);
    }

    let retention_duration = Duration::from_secs(retention_days * 24 * 60 * 60);
    let cutoff = SystemTime::now()
        .checked_sub(retention_duration)
        .unwrap_or(SystemTime::UNIX_EPOCH);

    let mut deleted_count = 0;

    for entry in fs::read_dir(logs_dir)? {
        let entry = entry?;
        let path = entry.path();

        let Some(name) = path.file_name().and_then(|n| n.to_str()) else {
            continue;
        };
        if !is_log_file_name(name, summary_file) || parse_log_file_name(name).is_none() {
            continue;
        }

        if let Ok(metadata) = entry.metadata() {
            if !metadata.is_file() {
                continue;
            }
            if let Ok(modified) = metadata.modified() {
                if modified < cutoff {
                    match fs::remove_file(&path) {
                        Ok(()) => deleted_count += 1,
                        Err(e) => tracing::warn!(
                            "Failed to remove expired log file {}: {}",
                            path.display(),
                            e
                        ),
                    }
                }
            }
        }
    }

    Ok(deleted_count)
}
