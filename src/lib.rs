//! # warden - agent process control plane
//!
//! warden starts, stops and tracks agent processes by identifier behind a
//! small JSON HTTP API, and serves an echo WebSocket channel for clients
//! checking connectivity.
//!
//! ## Crates
//!
//! - [`config`]: TOML configuration with environment and CLI overrides
//! - [`observability`]: logging initialization and `--debug-<crate>` flags
//! - [`registry`]: the agent process registry
//! - [`api`]: HTTP routes and the echo channel
//!
//! ## Embedding
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use warden::prelude::*;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let config = load_config(None, None)?;
//! let registry = Arc::new(warden::registry_from_config(&config.agent));
//! let state = ApiState::new(registry, warden::websocket_settings(&config.websocket));
//! let listener = tokio::net::TcpListener::bind(config.api.bind_address()).await?;
//! axum::serve(listener, create_http_server(state)).await?;
//! # Ok(())
//! # }
//! ```

use std::time::Duration;

pub use warden_agent_registry as registry;
pub use warden_api as api;
pub use warden_config as config;
pub use warden_observability as observability;

use warden_agent_registry::{AgentCommand, AgentRegistry, CommandLauncher, OutputMode, RegistrySettings};
use warden_api::WebSocketSettings;
use warden_config::{AgentConfig, AgentOutput, WardenConfig, WebSocketConfig};
use warden_observability::{FileLoggingSettings, LoggingSettings};

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod prelude {
    pub use warden_agent_registry::{AgentRegistry, StartOutcome, StopOutcome};
    pub use warden_api::{create_http_server, ApiState, WebSocketSettings};
    pub use warden_config::{load_config, validate_config, WardenConfig};
}

/// Agent command described by the `[agent]` section
pub fn agent_command(config: &AgentConfig) -> AgentCommand {
    let output = match config.output {
        AgentOutput::Discard => OutputMode::Discard,
        AgentOutput::Drain => OutputMode::Drain,
    };

    let mut command = AgentCommand::new(config.program.clone())
        .with_args(config.args.iter().cloned())
        .with_output(output);
    if let Some(dir) = &config.working_dir {
        command = command.with_working_dir(dir.clone());
    }
    for (key, value) in &config.env {
        command = command.with_env(key.clone(), value.clone());
    }
    command
}

/// Registry timeouts and limits from the `[agent]` section
pub fn registry_settings(config: &AgentConfig) -> RegistrySettings {
    RegistrySettings {
        stop_timeout: Duration::from_millis(config.stop_timeout_ms),
        kill_timeout: Duration::from_millis(config.kill_timeout_ms),
        max_agents: config.max_agents,
    }
}

/// Registry launching the configured agent command
pub fn registry_from_config(config: &AgentConfig) -> AgentRegistry {
    AgentRegistry::new(
        std::sync::Arc::new(CommandLauncher::new(agent_command(config))),
        registry_settings(config),
    )
}

pub fn websocket_settings(config: &WebSocketConfig) -> WebSocketSettings {
    WebSocketSettings::from_idle_secs(config.enabled, config.idle_timeout_secs)
}

/// Logging settings from `[system]` and `[logging]`
///
/// `system.debug` raises the default level to `debug`.
pub fn logging_settings(config: &WardenConfig) -> LoggingSettings {
    let level = if config.system.debug {
        "debug".to_string()
    } else {
        config.system.log_level.clone()
    };
    let format = match config.logging.format {
        warden_config::LogFormat::Text => warden_observability::LogFormat::Text,
        warden_config::LogFormat::Json => warden_observability::LogFormat::Json,
    };
    let file = config.logging.file_logging.then(|| FileLoggingSettings {
        log_dir: config.logging.log_dir.clone(),
        retention_runs: config.logging.retention_runs,
    });

    LoggingSettings { level, format, file }
}
