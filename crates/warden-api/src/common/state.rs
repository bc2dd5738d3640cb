// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::sync::Arc;
use std::time::Duration;

use warden_agent_registry::AgentRegistry;

/// Echo channel settings
#[derive(Debug, Clone)]
pub struct WebSocketSettings {
    /// Serve `/ws` at all
    pub enabled: bool,
    /// Close a connection after this long without an incoming frame (`None` = never)
    pub idle_timeout: Option<Duration>,
}

impl Default for WebSocketSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            idle_timeout: Some(Duration::from_secs(300)),
        }
    }
}

impl WebSocketSettings {
    /// Build from a seconds value where 0 disables the idle timeout
    pub fn from_idle_secs(enabled: bool, idle_timeout_secs: u64) -> Self {
        Self {
            enabled,
            idle_timeout: (idle_timeout_secs > 0).then(|| Duration::from_secs(idle_timeout_secs)),
        }
    }
}

/// Application state shared across all HTTP handlers
#[derive(Clone)]
pub struct ApiState {
    pub registry: Arc<AgentRegistry>,
    pub websocket: WebSocketSettings,
}

impl ApiState {
    pub fn new(registry: Arc<AgentRegistry>, websocket: WebSocketSettings) -> Self {
        Self { registry, websocket }
    }
}
