//! Summary update cycle

use std::path::PathBuf;

use anyhow::{Context, Result};
use tokio::fs;

use crate::config::{friendly_io_error_message, Config};
use crate::writer::is_log_file_name;

use super::{count_levels, LevelCounts, SummaryDocument, SummaryStore};

/// Scans a log directory and keeps its summary document current
#[derive(Debug, Clone)]
pub struct SummaryUpdater {
    logs_dir: PathBuf,
    summary_file: String,
    store: SummaryStore,
}

impl SummaryUpdater {
    /// Create an updater for `logs_dir`, keeping the summary in `logs_dir/summary_file`
    pub fn new(logs_dir: PathBuf, summary_file: impl Into<String>) -> Self {
        let summary_file = summary_file.into();
        let store = SummaryStore::new(logs_dir.join(&summary_file));
        Self {
            logs_dir,
            summary_file,
            store,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.logs_dir.clone(), config.summary_file.clone())
    }

    pub fn store(&self) -> &SummaryStore {
        &self.store
    }

    /// Run one update cycle and return the document that was written
    ///
    /// Unreadable log files are skipped. Listing the directory and writing the
    /// summary are the only failures that abort the cycle.
    pub async fn update(&self) -> Result<SummaryDocument> {
        let log_files = self.list_log_files().await?;
        let mut doc = self.store.load().await;

        let mut changed = 0usize;
        for name in &log_files {
            let Some(counts) = self.count_file(name).await else {
                continue;
            };
            if doc.merge(name, counts) {
                changed += 1;
            }
        }

        doc.touch();
        self.store.save(&doc).await?;

        tracing::info!(
            "Summary file updated ({} of {} log files changed)",
            changed,
            log_files.len()
        );
        Ok(doc)
    }

    /// Names of the log files to summarize, sorted
    async fn list_log_files(&self) -> Result<Vec<String>> {
        let mut entries = fs::read_dir(&self.logs_dir)
            .await
            .with_context(|| format!("Failed to list {}", self.logs_dir.display()))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .with_context(|| format!("Failed to list {}", self.logs_dir.display()))?
        {
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            if is_log_file_name(&name, &self.summary_file) {
                names.push(name);
            }
        }

        names.sort();
        Ok(names)
    }

    async fn count_file(&self, name: &str) -> Option<LevelCounts> {
        let path = self.logs_dir.join(name);
        match fs::read(&path).await {
            Ok(bytes) => Some(count_levels(&String::from_utf8_lossy(&bytes))),
            Err(e) => {
                tracing::error!(
                    "{}",
                    friendly_io_error_message(
                        &e,
                        &format!("Failed to read or process the log file {}", path.display())
                    )
                );
                None
            }
        }
    }
}

/// Update the summary document for the configured log directory
///
/// Failures are reported through `tracing` only.
pub async fn update_summary_file(config: &Config) {
    if let Err(e) = SummaryUpdater::from_config(config).update().await {
        tracing::error!("Failed to update summary file: {:#}", e);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::summary::FileSummary;
    use chrono::{DateTime, Utc};
    use std::path::Path;
    use tempfile::TempDir;

    fn old_stamp() -> DateTime<Utc> {
        "2000-01-01T00:00:00Z".parse().unwrap()
    }

    fn backup_count(dir: &Path) -> usize {
        std::fs::read_dir(dir)
            .unwrap()
            .filter(|e| {
                e.as_ref()
                    .unwrap()
                    .file_name()
                    .to_string_lossy()
                    .ends_with(".backup")
            })
            .count()
    }

    fn updater(dir: &Path) -> SummaryUpdater {
        SummaryUpdater::new(dir.to_path_buf(), "summary.log")
    }

    fn write(dir: &Path, name: &str, content: &str) {
        std::fs::write(dir.join(name), content).unwrap();
    }

    const SAMPLE: &str = "2024-01-01 10:00:00 ERROR: failed to connect\n\
                          2024-01-01 10:00:01 INFO: retrying\n\
                          something without a level\n";

    #[tokio::test]
    async fn test_first_run_creates_summary() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "20240101.log", SAMPLE);
        write(temp_dir.path(), "20240102.log", "2024-01-02 08:00:00 WARN: low disk\n");

        let doc = updater(temp_dir.path()).update().await.unwrap();

        assert!(temp_dir.path().join("summary.log").exists());
        assert_eq!(doc.logs.len(), 2);
        assert_eq!(
            doc.get("20240101.log").unwrap(),
            &FileSummary {
                filename: "20240101.log".to_string(),
                errors: 1,
                info: 1,
                warn: 0,
                total: 3,
            }
        );
        assert_eq!(doc.get("20240102.log").unwrap().warn, 1);
    }

    #[tokio::test]
    async fn test_ignores_summary_and_foreign_files() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "20240101.log", SAMPLE);
        write(temp_dir.path(), "notes.txt", "ERROR ERROR\n");

        let u = updater(temp_dir.path());
        u.update().await.unwrap();
        let doc = u.update().await.unwrap();

        let names: Vec<_> = doc.logs.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["20240101.log"]);
    }

    #[tokio::test]
    async fn test_rerun_only_advances_timestamp() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "20240101.log", SAMPLE);
        let u = updater(temp_dir.path());

        let first = u.update().await.unwrap();
        let mut stale = first.clone();
        stale.updated_at = old_stamp();
        u.store().save(&stale).await.unwrap();

        let second = u.update().await.unwrap();

        assert_eq!(first.logs, second.logs);
        assert!(second.updated_at > old_stamp());
        let persisted = u.store().load().await;
        assert_eq!(persisted.logs, first.logs);
        assert!(persisted.updated_at > old_stamp());
    }

    #[tokio::test]
    async fn test_changed_file_is_recomputed() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "20240101.log", SAMPLE);
        let u = updater(temp_dir.path());
        u.update().await.unwrap();

        write(
            temp_dir.path(),
            "20240101.log",
            "WARN one\nWARN two\nINFO three\nINFO four\n",
        );
        let doc = u.update().await.unwrap();

        assert_eq!(doc.logs.len(), 1);
        let entry = doc.get("20240101.log").unwrap();
        assert_eq!((entry.errors, entry.info, entry.warn, entry.total), (0, 2, 2, 4));
    }

    #[tokio::test]
    async fn test_same_line_count_rewrite_is_not_detected() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "20240101.log", "INFO a\n");
        let u = updater(temp_dir.path());
        u.update().await.unwrap();

        write(temp_dir.path(), "20240101.log", "ERROR b\n");
        let doc = u.update().await.unwrap();

        let entry = doc.get("20240101.log").unwrap();
        assert_eq!((entry.errors, entry.info), (0, 1));
    }

    #[tokio::test]
    async fn test_loads_existing_summary_from_disk() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "20240101.log", SAMPLE);
        updater(temp_dir.path()).update().await.unwrap();

        write(temp_dir.path(), "20240102.log", "INFO new day\n");
        let doc = updater(temp_dir.path()).update().await.unwrap();

        let names: Vec<_> = doc.logs.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["20240101.log", "20240102.log"]);
    }

    #[tokio::test]
    async fn test_corrupt_summary_starts_fresh() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "20240101.log", SAMPLE);
        write(temp_dir.path(), "summary.log", "not json at all");

        let doc = updater(temp_dir.path()).update().await.unwrap();

        assert_eq!(doc.logs.len(), 1);
        assert_eq!(backup_count(temp_dir.path()), 1);
    }

    #[tokio::test]
    async fn test_unreadable_file_keeps_prior_entry() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "20240101.log", SAMPLE);
        let u = updater(temp_dir.path());
        let mut first = u.update().await.unwrap();
        first.updated_at = old_stamp();
        u.store().save(&first).await.unwrap();

        // A directory with a log name cannot be read as a file
        std::fs::remove_file(temp_dir.path().join("20240101.log")).unwrap();
        std::fs::create_dir(temp_dir.path().join("20240101.log")).unwrap();
        write(temp_dir.path(), "20240102.log", "INFO fine\n");

        let second = u.update().await.unwrap();

        assert_eq!(second.get("20240101.log"), first.get("20240101.log"));
        assert_eq!(second.get("20240102.log").unwrap().total, 1);
        assert!(second.updated_at > old_stamp());

        let persisted = u.store().load().await;
        assert_eq!(persisted, second);
        assert!(persisted.updated_at > old_stamp());
    }

    #[tokio::test]
    async fn test_null_counters_from_older_summary_are_kept() {
        let temp_dir = TempDir::new().unwrap();
        write(temp_dir.path(), "20240101.log", SAMPLE);
        write(
            temp_dir.path(),
            "summary.log",
            r#"{
  "updatedAt": "2024-01-01T10:00:00.000Z",
  "logs": [
    { "filename": "20240101.log", "errors": 1, "info": 1, "warn": null, "total": 3 },
    { "filename": "20231201.log", "errors": 0, "info": 5, "warn": null, "total": 7 }
  ]
}"#,
        );

        let doc = updater(temp_dir.path()).update().await.unwrap();

        let names: Vec<_> = doc.logs.iter().map(|s| s.filename.as_str()).collect();
        assert_eq!(names, vec!["20240101.log", "20231201.log"]);
        assert_eq!(doc.get("20231201.log").unwrap().info, 5);
        assert_eq!(doc.get("20240101.log").unwrap().warn, 0);
        assert_eq!(backup_count(temp_dir.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_listing_leaves_summary_untouched() {
        let temp_dir = TempDir::new().unwrap();
        let summary = temp_dir.path().join("summary.log");
        std::fs::write(&summary, "{ corrupt").unwrap();

        // The store points at a real file while the log directory is missing
        let u = SummaryUpdater {
            logs_dir: temp_dir.path().join("nope"),
            summary_file: "summary.log".to_string(),
            store: SummaryStore::new(summary.clone()),
        };
        assert!(u.update().await.is_err());

        assert_eq!(std::fs::read_to_string(&summary).unwrap(), "{ corrupt");
        let leftovers: Vec<_> = std::fs::read_dir(temp_dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name())
            .collect();
        assert_eq!(leftovers.len(), 1);
    }

    #[tokio::test]
    async fn test_missing_directory_aborts() {
        let temp_dir = TempDir::new().unwrap();
        let missing = temp_dir.path().join("nope");

        assert!(updater(&missing).update().await.is_err());
        assert!(!missing.join("summary.log").exists());
    }

    #[tokio::test]
    async fn test_update_summary_file_absorbs_errors() {
        let temp_dir = TempDir::new().unwrap();
        let config = Config {
            logs_dir: temp_dir.path().join("nope"),
            ..Config::default()
        };
        update_summary_file(&config).await;
    }

    #[tokio::test]
    async fn test_non_utf8_content_is_counted() {
        let temp_dir = TempDir::new().unwrap();
        std::fs::write(
            temp_dir.path().join("20240101.log"),
            b"ERROR \xff\xfe bytes\nINFO ok\n",
        )
        .unwrap();

        let doc = updater(temp_dir.path()).update().await.unwrap();
        let entry = doc.get("20240101.log").unwrap();
        assert_eq!((entry.errors, entry.info, entry.total), (1, 1, 2));
    }
}
