//! logtally - daily rotating file logger with a per-file level summary
//!
//! [`writer::Logger`] appends `YYYY-MM-DD HH:mm:ss LEVEL: message` lines to
//! `logs/YYYYMMDD.log`. [`summary::SummaryUpdater`] scans those files and keeps
//! `logs/summary.log` up to date with per-file `ERROR` / `INFO` / `WARN` counts.

pub mod config;
pub mod diagnostics;
pub mod summary;
pub mod writer;
