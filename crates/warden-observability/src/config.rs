// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging settings consumed by [`crate::init_logging`]

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Console log format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum LogFormat {
    Text,
    Json,
}

/// File logging settings (only honored with the `file-logging` feature)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileLoggingSettings {
    /// Base directory; each run gets its own `run_<timestamp>` folder inside
    pub log_dir: PathBuf,
    /// Keep this many most recent run folders
    pub retention_runs: usize,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingSettings {
    /// Default level (trace, debug, info, warn, error); `RUST_LOG` overrides it
    pub level: String,
    pub format: LogFormat,
    pub file: Option<FileLoggingSettings>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        LoggingSettings {
            level: "info".to_string(),
            format: LogFormat::Text,
            file: None,
        }
    }
}

impl LoggingSettings {
    /// Level string normalized for `EnvFilter` (accepts `WARNING`, `Info`, ...)
    pub fn normalized_level(&self) -> String {
        match self.level.to_lowercase().as_str() {
            "warning" => "warn".to_string(),
            other => other.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalized_level() {
        let mut settings = LoggingSettings::default();
        assert_eq!(settings.normalized_level(), "info");

        settings.level = "WARNING".to_string();
        assert_eq!(settings.normalized_level(), "warn");

        settings.level = "Debug".to_string();
        assert_eq!(settings.normalized_level(), "debug");
    }
}
