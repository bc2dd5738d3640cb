use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};

use warden::prelude::*;
use warden_observability::{debug_flags_help, init_logging, parse_debug_flags};

/// warden - start, stop and track agent processes over HTTP
#[derive(Parser, Debug)]
#[command(name = "warden", version, author, long_about = None, after_help = debug_flags_help())]
struct Args {
    /// Path to a warden.toml (default: $WARDEN_CONFIG_PATH, then ./warden.toml)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Bind host (overrides config and HOST)
    #[arg(long)]
    host: Option<String>,

    /// Bind port (overrides config and PORT)
    #[arg(short, long)]
    port: Option<u16>,

    /// Default log level (trace, debug, info, warn, error)
    #[arg(long)]
    log_level: Option<String>,

    /// Program launched for every agent
    #[arg(long)]
    agent_program: Option<String>,
}

impl Args {
    /// CLI overrides in the key format understood by `apply_cli_overrides`
    fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        if let Some(host) = &self.host {
            overrides.insert("api_host".to_string(), host.clone());
        }
        if let Some(port) = self.port {
            overrides.insert("api_port".to_string(), port.to_string());
        }
        if let Some(level) = &self.log_level {
            overrides.insert("log_level".to_string(), level.clone());
        }
        if let Some(program) = &self.agent_program {
            overrides.insert("agent_program".to_string(), program.clone());
        }
        overrides
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // --debug-<crate> flags belong to observability, not clap
    let args = Args::parse_from(std::env::args().filter(|arg| !arg.starts_with("--debug-")));
    let debug_flags = parse_debug_flags();

    let config = load_config(args.config.as_deref(), Some(&args.overrides()))
        .context("Failed to load configuration")?;
    validate_config(&config).context("Invalid configuration")?;

    let log_guard = init_logging(&warden::logging_settings(&config), &debug_flags)
        .context("Failed to initialize logging")?;

    info!("warden v{} starting", warden::VERSION);
    if debug_flags.any_enabled() {
        info!("Debug logging enabled for: {:?}", debug_flags.enabled_crates);
    }
    if let Some(dir) = log_guard.log_dir() {
        info!("Writing logs to {}", dir.display());
    }
    info!(
        "Agent command: {} {}",
        config.agent.program,
        config.agent.args.join(" ")
    );

    let registry = Arc::new(warden::registry_from_config(&config.agent));
    let state = ApiState::new(
        Arc::clone(&registry),
        warden::websocket_settings(&config.websocket),
    );
    let app = create_http_server(state);

    let bind_address = config.api.bind_address();
    let listener = tokio::net::TcpListener::bind(&bind_address)
        .await
        .with_context(|| format!("Failed to bind {}", bind_address))?;
    info!("🚀 Listening on http://{}", bind_address);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    let stopped = registry.stop_all().await;
    if !registry.is_empty() {
        warn!("{} agents still tracked at exit", registry.len());
    }
    info!("✅ Shutdown complete ({} agents stopped)", stopped);
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, stopping agents...");
}
