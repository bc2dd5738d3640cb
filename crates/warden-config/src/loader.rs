// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults, optional)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, WardenConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Default file name searched for in the working directory
pub const CONFIG_FILE_NAME: &str = "warden.toml";

/// Find the warden configuration file
///
/// Search order:
/// 1. `WARDEN_CONFIG_PATH` environment variable (must exist if set)
/// 2. Current working directory: `./warden.toml`
///
/// Returns `Ok(None)` when nothing is configured and no file is present, in
/// which case the built-in defaults are used.
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if `WARDEN_CONFIG_PATH` names a missing file
pub fn find_config_file() -> ConfigResult<Option<PathBuf>> {
    if let Ok(env_path) = env::var("WARDEN_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(Some(path));
        }
        return Err(ConfigError::FileNotFound(format!(
            "file specified by WARDEN_CONFIG_PATH does not exist: {}",
            path.display()
        )));
    }

    let candidate = env::current_dir()?.join(CONFIG_FILE_NAME);
    if candidate.exists() {
        Ok(Some(candidate))
    } else {
        Ok(None)
    }
}

/// Load configuration
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is discovered
///   with [`find_config_file`]; a missing file falls back to defaults.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if an explicit config file is missing or contains invalid TOML
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<WardenConfig> {
    let config_file = match config_path {
        Some(path) if !path.exists() => {
            return Err(ConfigError::FileNotFound(path.display().to_string()));
        }
        Some(path) => Some(path.to_path_buf()),
        None => find_config_file()?,
    };

    let mut config = match config_file {
        Some(file) => {
            let content = fs::read_to_string(&file)?;
            toml::from_str(&content)?
        }
        None => WardenConfig::default(),
    };

    apply_environment_overrides(&mut config);

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli);
    }

    Ok(config)
}

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `HOST` / `WARDEN_API_HOST` -> `api.host` (namespaced variable wins)
/// - `PORT` / `WARDEN_API_PORT` -> `api.port` (namespaced variable wins)
/// - `WARDEN_LOG_LEVEL` -> `system.log_level`
/// - `WARDEN_AGENT_PROGRAM` -> `agent.program`
/// - `WARDEN_AGENT_STOP_TIMEOUT_MS` -> `agent.stop_timeout_ms`
/// - `WARDEN_WS_IDLE_TIMEOUT_SECS` -> `websocket.idle_timeout_secs`
///
/// Numeric values that fail to parse are ignored.
pub fn apply_environment_overrides(config: &mut WardenConfig) {
    for key in ["HOST", "WARDEN_API_HOST"] {
        if let Ok(value) = env::var(key) {
            config.api.host = value;
        }
    }
    for key in ["PORT", "WARDEN_API_PORT"] {
        if let Ok(value) = env::var(key) {
            if let Ok(port) = value.parse::<u16>() {
                config.api.port = port;
            }
        }
    }

    if let Ok(value) = env::var("WARDEN_LOG_LEVEL") {
        config.system.log_level = value;
    }

    if let Ok(value) = env::var("WARDEN_AGENT_PROGRAM") {
        config.agent.program = value;
    }
    if let Ok(value) = env::var("WARDEN_AGENT_STOP_TIMEOUT_MS") {
        if let Ok(ms) = value.parse::<u64>() {
            config.agent.stop_timeout_ms = ms;
        }
    }

    if let Ok(value) = env::var("WARDEN_WS_IDLE_TIMEOUT_SECS") {
        if let Ok(secs) = value.parse::<u64>() {
            config.websocket.idle_timeout_secs = secs;
        }
    }
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"api_host": "127.0.0.1", "api_port": "9000"}`)
pub fn apply_cli_overrides(config: &mut WardenConfig, cli_args: &HashMap<String, String>) {
    if let Some(value) = cli_args.get("api_host") {
        config.api.host = value.clone();
    }
    if let Some(value) = cli_args.get("api_port") {
        if let Ok(port) = value.parse::<u16>() {
            config.api.port = port;
        }
    }
    if let Some(value) = cli_args.get("log_level") {
        config.system.log_level = value.clone();
    }
    if let Some(value) = cli_args.get("debug") {
        config.system.debug = value.to_lowercase() == "true" || value == "1";
    }
    if let Some(value) = cli_args.get("agent_program") {
        config.agent.program = value.clone();
    }
}
