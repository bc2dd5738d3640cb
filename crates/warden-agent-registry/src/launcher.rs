//! Process launching: the "spawn an agent" capability consumed by the registry

use std::collections::HashMap;
use std::io;
use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::process::{Child, Command};
use tracing::{debug, trace};

/// What to do with an agent's stdout/stderr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Redirect to the null device
    Discard,
    /// Pipe and forward every line to the log at DEBUG
    Drain,
}

/// The fixed command every agent is launched with
#[derive(Debug, Clone)]
pub struct AgentCommand {
    pub program: String,
    pub args: Vec<String>,
    pub working_dir: Option<PathBuf>,
    pub env: HashMap<String, String>,
    pub output: OutputMode,
}

impl AgentCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            working_dir: None,
            env: HashMap::new(),
            output: OutputMode::Drain,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_output(mut self, output: OutputMode) -> Self {
        self.output = output;
        self
    }

    pub fn with_working_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.working_dir = Some(dir.into());
        self
    }

    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }
}

/// Spawns agent processes
///
/// Implementations must not block for long: the registry calls `launch`
/// while holding its slot lock so that check-and-insert stays atomic.
pub trait AgentLauncher: Send + Sync {
    /// Spawn the agent process tracked under `agent_id`
    ///
    /// Must be called from within a Tokio runtime.
    fn launch(&self, agent_id: &str) -> io::Result<Child>;
}

/// [`AgentLauncher`] running a fixed [`AgentCommand`]
#[derive(Debug, Clone)]
pub struct CommandLauncher {
    command: AgentCommand,
}

impl CommandLauncher {
    pub fn new(command: AgentCommand) -> Self {
        Self { command }
    }
}

impl AgentLauncher for CommandLauncher {
    fn launch(&self, agent_id: &str) -> io::Result<Child> {
        let mut cmd = Command::new(&self.command.program);
        cmd.args(&self.command.args)
            .envs(&self.command.env)
            .stdin(Stdio::null())
            .kill_on_drop(true);

        if let Some(dir) = &self.command.working_dir {
            cmd.current_dir(dir);
        }

        match self.command.output {
            OutputMode::Discard => {
                cmd.stdout(Stdio::null()).stderr(Stdio::null());
            }
            OutputMode::Drain => {
                cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
            }
        }

        let mut child = cmd.spawn()?;

        if let Some(stdout) = child.stdout.take() {
            tokio::spawn(drain_output(agent_id.to_string(), "stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(drain_output(agent_id.to_string(), "stderr", stderr));
        }

        Ok(child)
    }
}

/// Read a child's stream to EOF so the pipe never fills up
///
/// Lines are decoded lossily; agents are free to write binary garbage.
async fn drain_output<R>(agent_id: String, stream: &'static str, reader: R)
where
    R: AsyncRead + Unpin + Send + 'static,
{
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    let mut lines = 0u64;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                lines += 1;
                let line = String::from_utf8_lossy(&buf);
                debug!(target: "warden-agent-registry", agent_id = %agent_id, stream, "{}", line.trim_end());
            }
            Err(e) => {
                debug!(target: "warden-agent-registry", agent_id = %agent_id, stream, "Stopped reading agent output: {}", e);
                break;
            }
        }
    }

    trace!(target: "warden-agent-registry", agent_id = %agent_id, stream, lines, "Agent output closed");
}
