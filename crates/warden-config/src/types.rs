// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `warden.toml`. Every section is `#[serde(default)]`, so a partial file (or
//! no file at all) yields a runnable configuration.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct WardenConfig {
    pub system: SystemConfig,
    pub api: ApiConfig,
    pub agent: AgentConfig,
    pub websocket: WebSocketConfig,
    pub logging: LoggingConfig,
}

/// System-level configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SystemConfig {
    pub debug: bool,
    pub log_level: String,
}

impl Default for SystemConfig {
    fn default() -> Self {
        Self {
            debug: false,
            log_level: "info".to_string(),
        }
    }
}

/// HTTP/WebSocket listener configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

impl ApiConfig {
    /// `host:port` string suitable for `TcpListener::bind`
    ///
    /// IPv6 literals are bracketed (`[::1]:8000`).
    pub fn bind_address(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// What happens to a spawned agent's stdout/stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentOutput {
    /// Redirect both streams to the null device
    Discard,
    /// Pipe both streams and forward each line to the log
    Drain,
}

/// Agent process configuration
///
/// The command is fixed for the lifetime of the server; requests only choose
/// the identifier an agent is tracked under.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AgentConfig {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub output: AgentOutput,
    /// How long `stop` waits for the agent to exit after SIGTERM
    pub stop_timeout_ms: u64,
    /// How long `stop` waits after escalating to a hard kill
    pub kill_timeout_ms: u64,
    /// 0 = unlimited
    pub max_agents: usize,
    pub env: HashMap<String, String>,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            program: "python".to_string(),
            args: vec!["-m".to_string(), "openhands.agent".to_string()],
            working_dir: None,
            output: AgentOutput::Drain,
            stop_timeout_ms: 5000,
            kill_timeout_ms: 2000,
            max_agents: 0,
            env: HashMap::new(),
        }
    }
}

/// Echo channel configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct WebSocketConfig {
    pub enabled: bool,
    /// Close a connection that has been silent this long (0 = never)
    pub idle_timeout_secs: u64,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_timeout_secs: 300,
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Text,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub format: LogFormat,
    pub file_logging: bool,
    pub log_dir: PathBuf,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Text,
            file_logging: false,
            log_dir: PathBuf::from("./logs"),
            retention_runs: 10,
        }
    }
}
