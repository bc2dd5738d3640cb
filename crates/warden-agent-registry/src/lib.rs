//! Agent process registry for warden
//!
//! This crate owns the mapping from agent identifier to a running child
//! process. It knows nothing about HTTP: the API layer calls
//! [`AgentRegistry::start`] / [`AgentRegistry::stop`] and renders the
//! returned outcomes.
//!
//! Guarantees:
//! - at most one live process per identifier (check-and-insert is atomic)
//! - a slot disappears only after its process has actually exited, whether
//!   the exit was requested or not

pub mod launcher;
pub mod registry;
pub mod types;
mod watcher;

pub use launcher::{AgentCommand, AgentLauncher, CommandLauncher, OutputMode};
pub use registry::AgentRegistry;
pub use types::{AgentInfo, AgentState, ExitReport, RegistrySettings, StartOutcome, StopOutcome};

use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum RegistryError {
    #[error("Failed to spawn agent '{agent_id}': {source}")]
    SpawnFailed {
        agent_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to terminate agent '{agent_id}': {source}")]
    TerminationFailed {
        agent_id: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Agent '{agent_id}' did not exit within {waited:?}")]
    StopTimedOut { agent_id: String, waited: Duration },

    #[error("Agent registry full ({0} agents)")]
    CapacityReached(usize),
}

pub type Result<T> = std::result::Result<T, RegistryError>;
