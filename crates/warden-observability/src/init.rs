// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization for warden
//!
//! Installs a console layer and, when enabled, a JSON file layer inside a
//! timestamped run folder.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;
use crate::config::{LogFormat, LoggingSettings};

type BoxedLayer = Box<dyn Layer<Registry> + Send + Sync>;

/// Keeps background log writers alive; drop it last
pub struct LoggingGuard {
    #[cfg(feature = "file-logging")]
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
    log_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving file logs, if file logging is active
    pub fn log_dir(&self) -> Option<&Path> {
        self.log_dir.as_deref()
    }
}

/// Build the level filter: `RUST_LOG` when set, otherwise the configured
/// level plus per-crate debug directives
pub fn build_env_filter(settings: &LoggingSettings, debug_flags: &CrateDebugFlags) -> EnvFilter {
    match EnvFilter::try_from_default_env() {
        Ok(filter) => filter,
        Err(_) => EnvFilter::new(debug_flags.to_filter_string(&settings.normalized_level())),
    }
}

/// Initialize the global tracing subscriber
///
/// # Errors
///
/// Fails if the log directory cannot be created or a global subscriber is
/// already installed.
pub fn init_logging(
    settings: &LoggingSettings,
    debug_flags: &CrateDebugFlags,
) -> Result<LoggingGuard> {
    let mut layers: Vec<BoxedLayer> = Vec::new();

    let console_layer = match settings.format {
        LogFormat::Text => tracing_subscriber::fmt::layer()
            .with_target(true)
            .with_filter(build_env_filter(settings, debug_flags))
            .boxed(),
        LogFormat::Json => tracing_subscriber::fmt::layer()
            .json()
            .with_target(true)
            .with_filter(build_env_filter(settings, debug_flags))
            .boxed(),
    };
    layers.push(console_layer);

    #[cfg(feature = "file-logging")]
    let mut guard = LoggingGuard {
        _file_guard: None,
        log_dir: None,
    };
    #[cfg(not(feature = "file-logging"))]
    let guard = LoggingGuard { log_dir: None };

    if let Some(file_settings) = &settings.file {
        #[cfg(feature = "file-logging")]
        {
            let run_folder = create_run_folder(&file_settings.log_dir)?;
            cleanup_old_logs(&file_settings.log_dir, file_settings.retention_runs)?;

            let appender = tracing_appender::rolling::daily(&run_folder, "warden.log");
            let (non_blocking, file_guard) = tracing_appender::non_blocking(appender);
            let file_layer = tracing_subscriber::fmt::layer()
                .with_writer(non_blocking)
                .with_target(true)
                .with_file(true)
                .with_line_number(true)
                .json()
                .with_filter(build_env_filter(settings, debug_flags))
                .boxed();
            layers.push(file_layer);

            guard._file_guard = Some(file_guard);
            guard.log_dir = Some(run_folder);
        }
        #[cfg(not(feature = "file-logging"))]
        {
            eprintln!(
                "warning: file logging to {} requested but the `file-logging` feature is disabled",
                file_settings.log_dir.display()
            );
        }
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("a global tracing subscriber is already installed")?;

    Ok(guard)
}

#[cfg_attr(not(feature = "file-logging"), allow(dead_code))]
fn create_run_folder(base_log_dir: &Path) -> Result<PathBuf> {
    let timestamp = chrono::Utc::now().format("%Y%m%d_%H%M%S");
    let run_folder = base_log_dir.join(format!("run_{}", timestamp));
    std::fs::create_dir_all(&run_folder)
        .with_context(|| format!("Failed to create log directory: {}", run_folder.display()))?;
    Ok(run_folder)
}

/// Remove all but the newest `retention_runs` run folders
///
/// Folder names sort chronologically (`run_YYYYmmdd_HHMMSS`), so no
/// timestamp parsing is needed.
#[cfg_attr(not(feature = "file-logging"), allow(dead_code))]
fn cleanup_old_logs(base_log_dir: &Path, retention_runs: usize) -> Result<usize> {
    if !base_log_dir.exists() {
        return Ok(0);
    }

    let mut runs: Vec<PathBuf> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        let is_run = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with("run_"))
            .unwrap_or(false);
        if path.is_dir() && is_run {
            runs.push(path);
        }
    }

    if runs.len() <= retention_runs {
        return Ok(0);
    }

    runs.sort();
    let to_remove = runs.len() - retention_runs;
    let mut removed = 0;
    for path in runs.iter().take(to_remove) {
        match std::fs::remove_dir_all(path) {
            Ok(()) => removed += 1,
            Err(e) => eprintln!(
                "Warning: Failed to remove old log directory {}: {}",
                path.display(),
                e
            ),
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cleanup_keeps_newest_runs() {
        let dir = tempfile::tempdir().unwrap();
        for name in [
            "run_20250101_000000",
            "run_20250102_000000",
            "run_20250103_000000",
            "unrelated",
        ] {
            std::fs::create_dir(dir.path().join(name)).unwrap();
        }

        let removed = cleanup_old_logs(dir.path(), 2).unwrap();

        assert_eq!(removed, 1);
        assert!(!dir.path().join("run_20250101_000000").exists());
        assert!(dir.path().join("run_20250102_000000").exists());
        assert!(dir.path().join("run_20250103_000000").exists());
        assert!(dir.path().join("unrelated").exists());
    }

    #[test]
    fn test_cleanup_missing_dir_is_noop() {
        let dir = tempfile::tempdir().unwrap();
        let removed = cleanup_old_logs(&dir.path().join("missing"), 1).unwrap();
        assert_eq!(removed, 0);
    }

    #[test]
    fn test_create_run_folder() {
        let dir = tempfile::tempdir().unwrap();
        let run_folder = create_run_folder(dir.path()).unwrap();
        assert!(run_folder.is_dir());
        assert!(run_folder
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap()
            .starts_with("run_"));
    }
}
