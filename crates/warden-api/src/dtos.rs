// Data Transfer Objects
// Request and response bodies keep the field names of the FastAPI backend
// this server replaces, so existing frontends keep working.

use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use warden_agent_registry::{AgentInfo, AgentState};

/// Body of `/start-agent` and `/stop-agent`
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentRequest {
    /// Caller-chosen agent identifier (any string, including empty)
    #[schema(example = "agent-1")]
    pub agent_id: String,
}

/// Result of a start or stop request
///
/// Success carries `message` and `agent_id`; a soft failure ("already
/// running", "not found") carries only `error`. Both are HTTP 200.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct AgentActionResponse {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(example = "Agent started")]
    pub message: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AgentActionResponse {
    pub fn success(message: impl Into<String>, agent_id: impl Into<String>) -> Self {
        Self {
            message: Some(message.into()),
            agent_id: Some(agent_id.into()),
            error: None,
        }
    }

    pub fn soft_failure(error: impl Into<String>) -> Self {
        Self {
            message: None,
            agent_id: None,
            error: Some(error.into()),
        }
    }
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    #[schema(example = "ok")]
    pub status: String,
}

/// Snapshot of one running agent
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentStatusResponse {
    pub agent_id: String,

    /// OS process id
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pid: Option<u32>,

    /// "running" or "stopping"
    #[schema(example = "running")]
    pub state: String,

    /// Spawn time (RFC 3339)
    pub started_at: String,

    pub uptime_secs: i64,
}

impl From<AgentInfo> for AgentStatusResponse {
    fn from(info: AgentInfo) -> Self {
        let state = match info.state {
            AgentState::Running => "running",
            AgentState::Stopping => "stopping",
        };
        Self {
            uptime_secs: info.uptime_secs(),
            started_at: info.started_at.to_rfc3339(),
            state: state.to_string(),
            pid: info.pid,
            agent_id: info.agent_id,
        }
    }
}

/// All running agents, sorted by identifier
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct AgentListResponse {
    pub agents: Vec<AgentStatusResponse>,
    pub count: usize,
}
