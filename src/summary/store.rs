//! Summary document persistence
//!
//! Loads and saves the JSON summary. A document that fails to parse is moved aside
//! and replaced by an empty one; saves go through a temporary file and a rename.

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;
use tokio::fs;

use crate::config::{categorize_io_error, friendly_io_error_message, DiskErrorKind};

use super::SummaryDocument;

/// Append `suffix` to the file name of `path`
fn with_suffix(path: &Path, suffix: &str) -> PathBuf {
    let mut name = path
        .file_name()
        .map(OsString::from)
        .unwrap_or_default();
    name.push(suffix);
    path.with_file_name(name)
}

/// Pick a backup name that does not clobber an earlier backup
///
/// `summary.log` becomes `summary.log.<YYYYMMDDHHMMSS>.backup`, with `-1`, `-2`, ...
/// appended to the stamp when that name is taken.
async fn backup_path_for(path: &Path) -> PathBuf {
    let stamp = Utc::now().format("%Y%m%d%H%M%S").to_string();
    let mut attempt = 0u32;
    loop {
        let suffix = if attempt == 0 {
            format!(".{}.backup", stamp)
        } else {
            format!(".{}-{}.backup", stamp, attempt)
        };
        let candidate = with_suffix(path, &suffix);
        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            return candidate;
        }
        attempt += 1;
    }
}

/// Backup a corrupted file by renaming it with a .backup suffix
async fn backup_corrupted_file(path: &Path) {
    let backup_path = backup_path_for(path).await;
    if let Err(e) = fs::rename(path, &backup_path).await {
        tracing::warn!(
            "Failed to backup corrupted file {} to {}: {}",
            path.display(),
            backup_path.display(),
            e
        );
    } else {
        tracing::info!(
            "Corrupted summary file backed up to {}",
            backup_path.display()
        );
    }
}

/// Store for the persisted summary document
#[derive(Debug, Clone)]
pub struct SummaryStore {
    path: PathBuf,
}

impl SummaryStore {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }

    /// Get the path to the summary file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the document, starting fresh if it is missing or unusable
    pub async fn load(&self) -> SummaryDocument {
        let content = match fs::read_to_string(&self.path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("No summary file at {}, starting fresh", self.path.display());
                return SummaryDocument::new();
            }
            Err(e) if e.kind() == std::io::ErrorKind::InvalidData => {
                tracing::error!("Summary file is not valid UTF-8: {}", e);
                backup_corrupted_file(&self.path).await;
                return SummaryDocument::new();
            }
            Err(e) => {
                // Unreadable is not corrupt: leave the file where it is
                tracing::error!(
                    "{}",
                    friendly_io_error_message(&e, "Failed to read summary file")
                );
                return SummaryDocument::new();
            }
        };

        if content.trim().is_empty() {
            return SummaryDocument::new();
        }

        match serde_json::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => {
                tracing::error!("Summary file is corrupted: {}", e);
                backup_corrupted_file(&self.path).await;
                SummaryDocument::new()
            }
        }
    }

    /// Write the document as pretty-printed JSON, replacing the previous one atomically
    pub async fn save(&self, doc: &SummaryDocument) -> Result<()> {
        let content =
            serde_json::to_string_pretty(doc).context("Failed to serialize summary document")?;

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .await
                .context("Failed to create directory for summary file")?;
        }

        let tmp_path = with_suffix(&self.path, ".tmp");
        if let Err(e) = fs::write(&tmp_path, &content).await {
            return match categorize_io_error(&e) {
                DiskErrorKind::DiskFull => {
                    anyhow::bail!("Disk full - free space needed to save the summary file")
                }
                DiskErrorKind::PermissionDenied => {
                    anyhow::bail!(
                        "Permission denied writing to {:?}. Check file permissions.",
                        tmp_path
                    )
                }
                _ => Err(e).context("Failed to write summary file"),
            };
        }

        if let Err(e) = fs::rename(&tmp_path, &self.path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(e).context("Failed to replace summary file");
        }

        Ok(())
    }
}
