//! Per-process exit watcher
//!
//! Each spawned agent is owned by one watcher task. The watcher is the only
//! code that touches the `Child`: it delivers the termination request,
//! escalates to a hard kill once the grace period runs out, reaps the
//! process, frees the registry slot and publishes the [`ExitReport`].
//! Signalling through the owner of the `Child` means a pid is never signalled
//! after it has been reaped and possibly reused. The kill escalation does
//! not depend on any [`crate::AgentRegistry::stop`] caller still waiting.

use std::io;
use std::time::Duration;

use tokio::process::Child;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{error, info, warn};

use crate::registry::SlotMap;
use crate::types::{AgentState, ExitReport};

/// Ask the watcher to terminate its process; the reply carries the result
/// of delivering SIGTERM
pub(crate) struct TerminateRequest {
    pub reply: oneshot::Sender<io::Result<()>>,
}

pub(crate) type ExitReceiver = watch::Receiver<Option<ExitReport>>;

/// Wait until the watcher has published the exit
pub(crate) async fn wait_for_exit(exit: &mut ExitReceiver) -> ExitReport {
    if let Ok(report) = exit.wait_for(Option::is_some).await {
        return report.clone().unwrap_or_default();
    }
    // The watcher always publishes before dropping its sender
    ExitReport::default()
}

pub(crate) struct WatchedAgent {
    pub agents: SlotMap,
    pub agent_id: String,
    pub instance: u64,
    pub child: Child,
    /// Grace period between SIGTERM and the hard kill
    pub stop_timeout: Duration,
}

pub(crate) async fn watch_agent(
    agent: WatchedAgent,
    mut terminate_rx: mpsc::UnboundedReceiver<TerminateRequest>,
    exit_tx: watch::Sender<Option<ExitReport>>,
) {
    let WatchedAgent {
        agents,
        agent_id,
        instance,
        mut child,
        stop_timeout,
    } = agent;

    let mut forced = false;
    let mut kill_at: Option<Instant> = None;

    let status = loop {
        tokio::select! {
            status = child.wait() => break status,
            Some(request) = terminate_rx.recv() => {
                let result = terminate(&mut child);
                match &result {
                    Ok(()) => {
                        kill_at.get_or_insert_with(|| Instant::now() + stop_timeout);
                    }
                    Err(e) => {
                        warn!(target: "warden-agent-registry", agent_id = %agent_id, "Failed to signal agent: {}", e);
                    }
                }
                let _ = request.reply.send(result);
            }
            _ = tokio::time::sleep_until(kill_at.unwrap_or_else(Instant::now)), if kill_at.is_some() && !forced => {
                warn!(
                    target: "warden-agent-registry",
                    agent_id = %agent_id,
                    "Agent ignored SIGTERM for {:?}; killing",
                    stop_timeout
                );
                forced = true;
                if let Err(e) = child.start_kill() {
                    error!(target: "warden-agent-registry", agent_id = %agent_id, "Failed to kill agent: {}", e);
                }
            }
        }
    };

    let report = match status {
        Ok(status) => ExitReport::from_status(status, forced),
        Err(e) => {
            error!(target: "warden-agent-registry", agent_id = %agent_id, "Failed to wait for agent process: {}", e);
            ExitReport {
                forced,
                ..ExitReport::default()
            }
        }
    };

    let stop_requested = {
        let mut agents = agents.lock();
        match agents.get(&agent_id) {
            Some(slot) if slot.instance == instance => {
                let requested = slot.state == AgentState::Stopping;
                agents.remove(&agent_id);
                Some(requested)
            }
            _ => None,
        }
    };

    match stop_requested {
        Some(true) => info!(
            target: "warden-agent-registry",
            agent_id = %agent_id,
            code = ?report.code,
            signal = ?report.signal,
            forced = report.forced,
            "Agent stopped"
        ),
        Some(false) => warn!(
            target: "warden-agent-registry",
            agent_id = %agent_id,
            code = ?report.code,
            signal = ?report.signal,
            "Agent exited unexpectedly; slot released"
        ),
        None => error!(target: "warden-agent-registry", agent_id = %agent_id, instance, "Exited agent had no matching slot"),
    }

    exit_tx.send_replace(Some(report));
}

#[cfg(unix)]
fn terminate(child: &mut Child) -> io::Result<()> {
    use nix::sys::signal::{kill, Signal};
    use nix::unistd::Pid;

    // No pid means the child was already reaped; nothing left to signal
    let Some(pid) = child.id() else {
        return Ok(());
    };
    let pid = i32::try_from(pid).map_err(|_| io::Error::other("pid out of range"))?;
    kill(Pid::from_raw(pid), Signal::SIGTERM).map_err(io::Error::from)
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) -> io::Result<()> {
    child.start_kill()
}
