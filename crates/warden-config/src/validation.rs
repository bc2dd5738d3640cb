// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Collects every problem in one pass so the operator sees all of them at once.

use crate::{ConfigError, ConfigResult, WardenConfig};

/// Log levels understood by the logging layer
pub const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "warning", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidPort { port_name: String, port: u16 },
    MissingRequired { field: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPort { port_name, port } => {
                write!(f, "Port {} = {} is not a usable listening port", port_name, port)
            }
            Self::MissingRequired { field } => {
                write!(f, "Missing required configuration: {}", field)
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - A non-zero API port
/// - Required fields (API host, agent program)
/// - Valid value ranges (timeouts, log level)
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &WardenConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_ports(config, &mut errors);
    validate_required_fields(config, &mut errors);
    validate_value_ranges(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_ports(config: &WardenConfig, errors: &mut Vec<ConfigValidationError>) {
    // 0 would bind an ephemeral port nobody can find
    if config.api.port == 0 {
        errors.push(ConfigValidationError::InvalidPort {
            port_name: "api.port".to_string(),
            port: config.api.port,
        });
    }
}

fn validate_required_fields(config: &WardenConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.api.host.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "api.host".to_string(),
        });
    }

    if config.agent.program.trim().is_empty() {
        errors.push(ConfigValidationError::MissingRequired {
            field: "agent.program".to_string(),
        });
    }
}

fn validate_value_ranges(config: &WardenConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.agent.stop_timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "agent.stop_timeout_ms".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    if config.agent.kill_timeout_ms == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "agent.kill_timeout_ms".to_string(),
            reason: "must be positive".to_string(),
        });
    }

    let level = config.system.log_level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "system.log_level".to_string(),
            reason: format!("must be one of {}", LOG_LEVELS.join(", ")),
        });
    }
}
