//! Log levels accepted by the writer

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Severity of a log message, most severe first
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Error,
    Warn,
    #[default]
    Info,
    Http,
    Verbose,
    Debug,
    Silly,
}

/// Returned when a level name is not recognized
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown log level: {0:?}")]
pub struct UnknownLevel(pub String);

impl Level {
    /// Uppercase token written into log lines
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Error => "ERROR",
            Level::Warn => "WARN",
            Level::Info => "INFO",
            Level::Http => "HTTP",
            Level::Verbose => "VERBOSE",
            Level::Debug => "DEBUG",
            Level::Silly => "SILLY",
        }
    }

    /// Whether a message at this level passes a writer configured with `threshold`
    pub fn passes(&self, threshold: Level) -> bool {
        *self <= threshold
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = UnknownLevel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "error" => Ok(Level::Error),
            "warn" | "warning" => Ok(Level::Warn),
            "info" => Ok(Level::Info),
            "http" => Ok(Level::Http),
            "verbose" => Ok(Level::Verbose),
            "debug" => Ok(Level::Debug),
            "silly" => Ok(Level::Silly),
            _ => Err(UnknownLevel(s.to_string())),
        }
    }
}
