//! Agent registry implementation

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use tokio::sync::{mpsc, oneshot, watch};
use tokio::time::Instant;
use tracing::{debug, info, warn};

use crate::launcher::AgentLauncher;
use crate::types::{AgentInfo, AgentState, RegistrySettings, StartOutcome, StopOutcome};
use crate::watcher::{self, ExitReceiver, TerminateRequest, WatchedAgent};
use crate::{RegistryError, Result};

/// One occupied identifier
pub(crate) struct AgentSlot {
    /// Distinguishes successive processes started under the same identifier
    pub instance: u64,
    pub pid: Option<u32>,
    pub state: AgentState,
    pub started_at: DateTime<Utc>,
    terminate: mpsc::UnboundedSender<TerminateRequest>,
    exit: ExitReceiver,
}

impl AgentSlot {
    fn info(&self, agent_id: &str) -> AgentInfo {
        AgentInfo {
            agent_id: agent_id.to_string(),
            pid: self.pid,
            state: self.state,
            started_at: self.started_at,
        }
    }
}

pub(crate) type SlotMap = Arc<Mutex<HashMap<String, AgentSlot>>>;

/// Registry of running agent processes
///
/// A single coarse mutex guards the whole map. Cardinality is expected to be
/// small, and the lock is never held across an `.await`; the only blocking
/// work done under it is the `spawn` syscall in [`AgentRegistry::start`].
pub struct AgentRegistry {
    agents: SlotMap,
    launcher: Arc<dyn AgentLauncher>,
    settings: RegistrySettings,
    next_instance: AtomicU64,
}

impl AgentRegistry {
    /// Create an empty registry
    pub fn new(launcher: Arc<dyn AgentLauncher>, settings: RegistrySettings) -> Self {
        info!(
            target: "warden-agent-registry",
            "Initializing agent registry (max_agents={}, stop_timeout={:?}, kill_timeout={:?})",
            settings.max_agents, settings.stop_timeout, settings.kill_timeout
        );
        Self {
            agents: Arc::new(Mutex::new(HashMap::new())),
            launcher,
            settings,
            next_instance: AtomicU64::new(0),
        }
    }

    /// Start an agent under `agent_id`
    ///
    /// The presence check, the spawn and the insert happen under one lock
    /// acquisition: of two concurrent starts for the same identifier exactly
    /// one spawns, the other gets [`StartOutcome::AlreadyRunning`]. A slot that
    /// is still stopping counts as running.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self, agent_id: &str) -> Result<StartOutcome> {
        let mut agents = self.agents.lock();

        if agents.contains_key(agent_id) {
            debug!(target: "warden-agent-registry", agent_id = %agent_id, "Start rejected: agent already running");
            return Ok(StartOutcome::AlreadyRunning);
        }

        if self.settings.max_agents > 0 && agents.len() >= self.settings.max_agents {
            warn!(target: "warden-agent-registry", "Agent registry full ({}/{})", agents.len(), self.settings.max_agents);
            return Err(RegistryError::CapacityReached(self.settings.max_agents));
        }

        let child = self
            .launcher
            .launch(agent_id)
            .map_err(|source| RegistryError::SpawnFailed {
                agent_id: agent_id.to_string(),
                source,
            })?;

        let pid = child.id();
        let instance = self.next_instance.fetch_add(1, Ordering::Relaxed);
        let (terminate_tx, terminate_rx) = mpsc::unbounded_channel();
        let (exit_tx, exit_rx) = watch::channel(None);

        agents.insert(
            agent_id.to_string(),
            AgentSlot {
                instance,
                pid,
                state: AgentState::Running,
                started_at: Utc::now(),
                terminate: terminate_tx,
                exit: exit_rx,
            },
        );
        let running = agents.len();
        drop(agents);

        let watched = WatchedAgent {
            agents: Arc::clone(&self.agents),
            agent_id: agent_id.to_string(),
            instance,
            child,
            stop_timeout: self.settings.stop_timeout,
        };
        tokio::spawn(watcher::watch_agent(watched, terminate_rx, exit_tx));

        info!(target: "warden-agent-registry", agent_id = %agent_id, pid = ?pid, "✓ Agent started (total agents: {})", running);

        Ok(StartOutcome::Started {
            agent_id: agent_id.to_string(),
            pid,
        })
    }

    /// Stop the agent running under `agent_id`
    ///
    /// Asks the agent's watcher to send SIGTERM. The watcher escalates to a
    /// hard kill after `stop_timeout` on its own, so the escalation happens
    /// even if this future is dropped. The caller waits at most
    /// `stop_timeout + kill_timeout` for the exit. When this returns
    /// [`StopOutcome::Stopped`] the identifier is already free.
    /// A stop racing another stop on the same identifier joins its wait.
    pub async fn stop(&self, agent_id: &str) -> Result<StopOutcome> {
        let waited = self.settings.stop_timeout + self.settings.kill_timeout;
        let deadline = Instant::now() + waited;

        let (terminate, mut exit, instance, first_stop) = {
            let mut agents = self.agents.lock();
            let Some(slot) = agents.get_mut(agent_id) else {
                debug!(target: "warden-agent-registry", agent_id = %agent_id, "Stop rejected: agent not found");
                return Ok(StopOutcome::NotFound);
            };
            let first_stop = slot.state == AgentState::Running;
            slot.state = AgentState::Stopping;
            (slot.terminate.clone(), slot.exit.clone(), slot.instance, first_stop)
        };

        if first_stop {
            info!(target: "warden-agent-registry", agent_id = %agent_id, "Stopping agent");
            if let Err(e) = self.request_terminate(agent_id, &terminate).await {
                self.revert_to_running(agent_id, instance);
                return Err(e);
            }
        } else {
            debug!(target: "warden-agent-registry", agent_id = %agent_id, "Agent already stopping; waiting for exit");
        }

        match tokio::time::timeout_at(deadline, watcher::wait_for_exit(&mut exit)).await {
            Ok(exit) => Ok(StopOutcome::Stopped {
                agent_id: agent_id.to_string(),
                exit,
            }),
            Err(_) => Err(RegistryError::StopTimedOut {
                agent_id: agent_id.to_string(),
                waited,
            }),
        }
    }

    /// Stop every registered agent concurrently
    ///
    /// Returns how many agents were stopped. Failures are logged, not
    /// returned: this runs during shutdown where nobody can act on them.
    pub async fn stop_all(&self) -> usize {
        let ids: Vec<String> = self.agents.lock().keys().cloned().collect();
        if ids.is_empty() {
            return 0;
        }

        info!(target: "warden-agent-registry", "Stopping {} agents", ids.len());
        let results = futures_util::future::join_all(ids.iter().map(|id| self.stop(id))).await;

        let mut stopped = 0;
        for (id, result) in ids.iter().zip(results) {
            match result {
                Ok(StopOutcome::Stopped { .. }) => stopped += 1,
                Ok(StopOutcome::NotFound) => debug!(target: "warden-agent-registry", agent_id = %id, "Agent exited before shutdown stop"),
                Err(e) => warn!(target: "warden-agent-registry", agent_id = %id, "Failed to stop agent during shutdown: {}", e),
            }
        }
        stopped
    }

    /// Snapshot of one agent
    pub fn get(&self, agent_id: &str) -> Option<AgentInfo> {
        self.agents.lock().get(agent_id).map(|slot| slot.info(agent_id))
    }

    /// Snapshot of every agent, sorted by identifier
    pub fn list(&self) -> Vec<AgentInfo> {
        let mut infos: Vec<AgentInfo> = self
            .agents
            .lock()
            .iter()
            .map(|(id, slot)| slot.info(id))
            .collect();
        infos.sort_by(|a, b| a.agent_id.cmp(&b.agent_id));
        infos
    }

    pub fn contains(&self, agent_id: &str) -> bool {
        self.agents.lock().contains_key(agent_id)
    }

    pub fn len(&self) -> usize {
        self.agents.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.agents.lock().is_empty()
    }

    async fn request_terminate(
        &self,
        agent_id: &str,
        terminate: &mpsc::UnboundedSender<TerminateRequest>,
    ) -> Result<()> {
        let (reply_tx, reply_rx) = oneshot::channel();

        // A closed channel or a dropped reply both mean the watcher already
        // observed the exit; the caller's wait will pick it up
        if terminate.send(TerminateRequest { reply: reply_tx }).is_err() {
            return Ok(());
        }
        match reply_rx.await {
            Ok(Err(source)) => Err(RegistryError::TerminationFailed {
                agent_id: agent_id.to_string(),
                source,
            }),
            Ok(Ok(())) | Err(_) => Ok(()),
        }
    }

    fn revert_to_running(&self, agent_id: &str, instance: u64) {
        if let Some(slot) = self.agents.lock().get_mut(agent_id) {
            if slot.instance == instance {
                slot.state = AgentState::Running;
            }
        }
    }
}

impl Drop for AgentRegistry {
    fn drop(&mut self) {
        let remaining = self.agents.lock().len();
        if remaining > 0 {
            debug!(target: "warden-agent-registry", "Agent registry dropped with {} agents still tracked", remaining);
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use crate::launcher::{AgentCommand, CommandLauncher, OutputMode};
    use std::io;
    use std::time::Duration;
    use tokio::process::Child;

    fn registry_for(command: AgentCommand, settings: RegistrySettings) -> Arc<AgentRegistry> {
        Arc::new(AgentRegistry::new(
            Arc::new(CommandLauncher::new(command)),
            settings,
        ))
    }

    fn sleeper_registry() -> Arc<AgentRegistry> {
        registry_for(
            AgentCommand::new("sleep")
                .with_args(["30"])
                .with_output(OutputMode::Discard),
            RegistrySettings::default(),
        )
    }

    async fn wait_until_absent(registry: &AgentRegistry, agent_id: &str) {
        for _ in 0..100 {
            if !registry.contains(agent_id) {
                return;
            }
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
        panic!("agent '{}' never left the registry", agent_id);
    }

    struct FailingLauncher;

    impl AgentLauncher for FailingLauncher {
        fn launch(&self, _agent_id: &str) -> io::Result<Child> {
            Err(io::Error::new(io::ErrorKind::NotFound, "no such agent binary"))
        }
    }

    /// Log sink shared between a test and its subscriber
    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl io::Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl CapturedLogs {
        fn capture<T>(&self, f: impl FnOnce() -> T) -> T {
            let sink = self.clone();
            let subscriber = tracing_subscriber::fmt()
                .with_max_level(tracing::Level::TRACE)
                .with_ansi(false)
                .with_target(true)
                .with_writer(move || sink.clone())
                .finish();
            tracing::subscriber::with_default(subscriber, f)
        }

        fn text(&self) -> String {
            String::from_utf8_lossy(&self.0.lock()).into_owned()
        }
    }

    #[test]
    fn test_logs_use_crate_target() {
        let logs = CapturedLogs::default();
        logs.capture(|| AgentRegistry::new(Arc::new(FailingLauncher), RegistrySettings::default()));

        let text = logs.text();
        assert!(text.contains("warden-agent-registry:"), "{}", text);
        assert!(!text.contains("warden_agent_registry::"), "{}", text);
    }

    #[test]
    fn test_spawn_failure_is_not_logged_as_error_here() {
        let registry = AgentRegistry::new(Arc::new(FailingLauncher), RegistrySettings::default());
        let logs = CapturedLogs::default();

        let result = logs.capture(|| registry.start("a"));

        assert!(matches!(result, Err(RegistryError::SpawnFailed { .. })));
        assert!(!logs.text().contains("ERROR"), "{}", logs.text());
    }

    #[tokio::test]
    async fn test_start_then_duplicate_start() {
        let registry = sleeper_registry();

        let first = registry.start("a").unwrap();
        assert!(matches!(first, StartOutcome::Started { ref agent_id, pid: Some(_) } if agent_id == "a"));

        let second = registry.start("a").unwrap();
        assert_eq!(second, StartOutcome::AlreadyRunning);
        assert_eq!(registry.len(), 1);

        registry.stop_all().await;
    }

    #[tokio::test]
    async fn test_stop_unknown_agent() {
        let registry = sleeper_registry();
        assert_eq!(registry.stop("ghost").await.unwrap(), StopOutcome::NotFound);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_start_stop_stop() {
        let registry = sleeper_registry();
        registry.start("a").unwrap();

        match registry.stop("a").await.unwrap() {
            StopOutcome::Stopped { agent_id, exit } => {
                assert_eq!(agent_id, "a");
                assert_eq!(exit.signal, Some(nix::sys::signal::Signal::SIGTERM as i32));
                assert!(!exit.forced);
            }
            other => panic!("expected Stopped, got {:?}", other),
        }
        assert!(!registry.contains("a"));

        assert_eq!(registry.stop("a").await.unwrap(), StopOutcome::NotFound);
    }

    #[tokio::test]
    async fn test_restart_after_stop() {
        let registry = sleeper_registry();
        registry.start("a").unwrap();
        registry.stop("a").await.unwrap();

        assert!(matches!(registry.start("a").unwrap(), StartOutcome::Started { .. }));
        registry.stop_all().await;
    }

    #[tokio::test]
    async fn test_empty_identifier_is_accepted() {
        let registry = sleeper_registry();
        assert!(matches!(registry.start("").unwrap(), StartOutcome::Started { .. }));
        assert!(registry.contains(""));
        registry.stop_all().await;
    }

    #[tokio::test]
    async fn test_spawn_failure_inserts_nothing() {
        let registry = AgentRegistry::new(Arc::new(FailingLauncher), RegistrySettings::default());

        let err = registry.start("a").unwrap_err();
        assert!(matches!(err, RegistryError::SpawnFailed { ref agent_id, .. } if agent_id == "a"));
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_failure() {
        let registry = registry_for(
            AgentCommand::new("/nonexistent/warden-test-agent"),
            RegistrySettings::default(),
        );
        assert!(matches!(registry.start("a"), Err(RegistryError::SpawnFailed { .. })));
        assert!(!registry.contains("a"));
    }

    #[tokio::test]
    async fn test_self_exit_releases_slot() {
        let registry = registry_for(
            AgentCommand::new("sh").with_args(["-c", "exit 3"]),
            RegistrySettings::default(),
        );

        registry.start("short").unwrap();
        wait_until_absent(&registry, "short").await;

        assert_eq!(registry.stop("short").await.unwrap(), StopOutcome::NotFound);
        assert!(matches!(registry.start("short").unwrap(), StartOutcome::Started { .. }));
    }

    #[tokio::test]
    async fn test_stop_escalates_to_kill() {
        let registry = registry_for(
            AgentCommand::new("sh")
                .with_args(["-c", "trap '' TERM; sleep 5"])
                .with_output(OutputMode::Discard),
            RegistrySettings {
                stop_timeout: Duration::from_millis(300),
                kill_timeout: Duration::from_secs(2),
                max_agents: 0,
            },
        );

        registry.start("stubborn").unwrap();
        // let the shell install its trap before we signal it
        tokio::time::sleep(Duration::from_millis(200)).await;

        match registry.stop("stubborn").await.unwrap() {
            StopOutcome::Stopped { exit, .. } => {
                assert!(exit.forced);
                assert_eq!(exit.signal, Some(nix::sys::signal::Signal::SIGKILL as i32));
            }
            other => panic!("expected Stopped, got {:?}", other),
        }
        assert!(!registry.contains("stubborn"));
    }

    #[tokio::test]
    async fn test_capacity_limit() {
        let registry = registry_for(
            AgentCommand::new("sleep")
                .with_args(["30"])
                .with_output(OutputMode::Discard),
            RegistrySettings {
                max_agents: 2,
                ..RegistrySettings::default()
            },
        );

        registry.start("agent1").unwrap();
        registry.start("agent2").unwrap();
        assert!(matches!(registry.start("agent3"), Err(RegistryError::CapacityReached(2))));
        // a duplicate is still a soft result, not a capacity error
        assert_eq!(registry.start("agent1").unwrap(), StartOutcome::AlreadyRunning);
        assert_eq!(registry.len(), 2);

        assert_eq!(registry.stop_all().await, 2);
        assert!(registry.is_empty());
    }

    #[tokio::test]
    async fn test_list_is_sorted_snapshot() {
        let registry = sleeper_registry();
        registry.start("b").unwrap();
        registry.start("a").unwrap();

        let infos = registry.list();
        let ids: Vec<&str> = infos.iter().map(|i| i.agent_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
        assert!(infos.iter().all(|i| i.state == AgentState::Running && i.pid.is_some()));

        let a = registry.get("a").unwrap();
        assert_eq!(a.agent_id, "a");
        assert!(registry.get("c").is_none());

        registry.stop_all().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_starts_spawn_once() {
        let registry = sleeper_registry();
        let barrier = Arc::new(tokio::sync::Barrier::new(8));

        let mut handles = Vec::new();
        for _ in 0..8 {
            let registry = Arc::clone(&registry);
            let barrier = Arc::clone(&barrier);
            handles.push(tokio::spawn(async move {
                barrier.wait().await;
                registry.start("a").unwrap()
            }));
        }

        let mut started = 0;
        let mut rejected = 0;
        for handle in handles {
            match handle.await.unwrap() {
                StartOutcome::Started { .. } => started += 1,
                StartOutcome::AlreadyRunning => rejected += 1,
            }
        }

        assert_eq!(started, 1);
        assert_eq!(rejected, 7);
        assert_eq!(registry.len(), 1);

        registry.stop_all().await;
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_concurrent_stops_join_same_wait() {
        let registry = sleeper_registry();
        registry.start("a").unwrap();

        let (first, second) = tokio::join!(registry.stop("a"), registry.stop("a"));

        // whichever stop saw the slot first delivered SIGTERM; the other either
        // joined the wait or arrived after the slot was freed
        let outcomes = [first.unwrap(), second.unwrap()];
        assert!(outcomes.iter().any(|o| matches!(o, StopOutcome::Stopped { .. })));
        assert!(!registry.contains("a"));
    }

    #[tokio::test]
    async fn test_start_while_stopping_is_rejected() {
        let registry = registry_for(
            AgentCommand::new("sh")
                .with_args(["-c", "trap '' TERM; sleep 5"])
                .with_output(OutputMode::Discard),
            RegistrySettings {
                stop_timeout: Duration::from_millis(500),
                kill_timeout: Duration::from_secs(2),
                max_agents: 0,
            },
        );
        registry.start("a").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        let registry_for_stop = Arc::clone(&registry);
        let stopper = tokio::spawn(async move { registry_for_stop.stop("a").await });

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(registry.get("a").unwrap().state, AgentState::Stopping);
        assert_eq!(registry.start("a").unwrap(), StartOutcome::AlreadyRunning);

        assert!(matches!(stopper.await.unwrap().unwrap(), StopOutcome::Stopped { .. }));
    }

    fn stubborn_registry(stop_timeout: Duration, kill_timeout: Duration) -> Arc<AgentRegistry> {
        registry_for(
            AgentCommand::new("sh")
                .with_args(["-c", "trap '' TERM; sleep 30"])
                .with_output(OutputMode::Discard),
            RegistrySettings {
                stop_timeout,
                kill_timeout,
                max_agents: 0,
            },
        )
    }

    #[tokio::test]
    async fn test_abandoned_stop_still_kills_agent() {
        let registry = stubborn_registry(Duration::from_millis(300), Duration::from_millis(500));
        registry.start("a").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        // the caller gives up long before the grace period ends
        let abandoned = tokio::time::timeout(Duration::from_millis(50), registry.stop("a")).await;
        assert!(abandoned.is_err());
        assert_eq!(registry.get("a").unwrap().state, AgentState::Stopping);

        wait_until_absent(&registry, "a").await;
        assert!(matches!(registry.start("a").unwrap(), StartOutcome::Started { .. }));

        registry.stop_all().await;
    }

    #[tokio::test]
    async fn test_stop_times_out_then_watcher_frees_slot() {
        let registry = stubborn_registry(Duration::from_millis(300), Duration::ZERO);
        registry.start("a").unwrap();
        tokio::time::sleep(Duration::from_millis(200)).await;

        match registry.stop("a").await {
            Err(RegistryError::StopTimedOut { agent_id, waited }) => {
                assert_eq!(agent_id, "a");
                assert_eq!(waited, Duration::from_millis(300));
            }
            other => panic!("expected StopTimedOut, got {:?}", other),
        }

        // escalation belongs to the watcher, not to the timed-out caller
        wait_until_absent(&registry, "a").await;
    }
}
