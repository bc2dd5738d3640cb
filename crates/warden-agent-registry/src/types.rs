//! Core types for the agent registry

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::process::ExitStatus;
use std::time::Duration;

/// Lifecycle state of an occupied slot
///
/// An identifier without a slot is simply not running; there is no
/// retained "exited" state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AgentState {
    Running,
    /// Termination requested, exit not yet observed
    Stopping,
}

/// Point-in-time view of one registry slot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AgentInfo {
    pub agent_id: String,
    pub pid: Option<u32>,
    pub state: AgentState,
    pub started_at: DateTime<Utc>,
}

impl AgentInfo {
    /// Seconds since the agent was spawned
    pub fn uptime_secs(&self) -> i64 {
        (Utc::now() - self.started_at).num_seconds().max(0)
    }
}

/// How an agent process ended
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExitReport {
    /// Exit code, if the process exited normally
    pub code: Option<i32>,
    /// Terminating signal (unix only)
    pub signal: Option<i32>,
    /// True if the registry had to escalate to a hard kill
    pub forced: bool,
}

impl ExitReport {
    pub fn from_status(status: ExitStatus, forced: bool) -> Self {
        #[cfg(unix)]
        let signal = {
            use std::os::unix::process::ExitStatusExt;
            status.signal()
        };
        #[cfg(not(unix))]
        let signal = None;

        Self {
            code: status.code(),
            signal,
            forced,
        }
    }
}

/// Result of [`crate::AgentRegistry::start`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartOutcome {
    Started { agent_id: String, pid: Option<u32> },
    /// The identifier already has a slot (running or stopping); nothing was spawned
    AlreadyRunning,
}

/// Result of [`crate::AgentRegistry::stop`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopOutcome {
    /// The process has exited and the identifier is free again
    Stopped { agent_id: String, exit: ExitReport },
    /// No slot for the identifier; no process was touched
    NotFound,
}

/// Registry tuning knobs
#[derive(Debug, Clone)]
pub struct RegistrySettings {
    /// Grace period between SIGTERM and the hard kill
    pub stop_timeout: Duration,
    /// How long to wait for the exit after the hard kill
    pub kill_timeout: Duration,
    /// Maximum number of concurrent agents (0 = unlimited)
    pub max_agents: usize,
}

impl Default for RegistrySettings {
    fn default() -> Self {
        Self {
            stop_timeout: Duration::from_secs(5),
            kill_timeout: Duration::from_secs(2),
            max_agents: 0,
        }
    }
}
