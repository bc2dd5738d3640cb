// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Agent lifecycle endpoints
//!
//! Duplicate starts and stops of unknown agents are soft failures: HTTP 200
//! with an `error` field. Only registry faults become error statuses.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use tracing::{error, warn};
use warden_agent_registry::{StartOutcome, StopOutcome};

use crate::common::{ApiError, ApiErrorCode, ApiResult, ApiState};
use crate::dtos::{AgentActionResponse, AgentListResponse, AgentRequest, AgentStatusResponse};

pub const AGENT_STARTED: &str = "Agent started";
pub const AGENT_STOPPED: &str = "Agent stopped";
pub const AGENT_ALREADY_RUNNING: &str = "Agent already running";
pub const AGENT_NOT_FOUND: &str = "Agent not found";

fn reject_body(rejection: JsonRejection) -> ApiError {
    warn!(target: "warden-api", "Rejected request body: {}", rejection.body_text());
    if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
        return ApiError::new(rejection.body_text()).with_code(ApiErrorCode::PayloadTooLarge);
    }
    ApiError::invalid_input(rejection.body_text())
}

/// POST /start-agent
///
/// Spawn the agent process for `agent_id`
#[utoipa::path(
    post,
    path = "/start-agent",
    request_body = AgentRequest,
    responses(
        (status = 200, description = "Agent started, or already running", body = AgentActionResponse),
        (status = 413, description = "Request body exceeds the size limit", body = ApiError),
        (status = 422, description = "Malformed request body", body = ApiError),
        (status = 500, description = "Agent process could not be spawned", body = ApiError),
        (status = 503, description = "Agent limit reached", body = ApiError)
    ),
    tag = "Agents"
)]
pub async fn start_agent(
    State(state): State<ApiState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> ApiResult<Json<AgentActionResponse>> {
    let Json(request) = payload.map_err(reject_body)?;

    match state.registry.start(&request.agent_id) {
        Ok(StartOutcome::Started { agent_id, .. }) => {
            Ok(Json(AgentActionResponse::success(AGENT_STARTED, agent_id)))
        }
        Ok(StartOutcome::AlreadyRunning) => {
            Ok(Json(AgentActionResponse::soft_failure(AGENT_ALREADY_RUNNING)))
        }
        Err(e) => {
            error!(target: "warden-api", agent_id = %request.agent_id, "Start failed: {}", e);
            Err(ApiError::from(e))
        }
    }
}

/// POST /stop-agent
///
/// Terminate the agent process for `agent_id` and wait for it to exit
#[utoipa::path(
    post,
    path = "/stop-agent",
    request_body = AgentRequest,
    responses(
        (status = 200, description = "Agent stopped, or not found", body = AgentActionResponse),
        (status = 413, description = "Request body exceeds the size limit", body = ApiError),
        (status = 422, description = "Malformed request body", body = ApiError),
        (status = 500, description = "Agent could not be terminated", body = ApiError)
    ),
    tag = "Agents"
)]
pub async fn stop_agent(
    State(state): State<ApiState>,
    payload: Result<Json<AgentRequest>, JsonRejection>,
) -> ApiResult<Json<AgentActionResponse>> {
    let Json(request) = payload.map_err(reject_body)?;

    match state.registry.stop(&request.agent_id).await {
        Ok(StopOutcome::Stopped { agent_id, .. }) => {
            Ok(Json(AgentActionResponse::success(AGENT_STOPPED, agent_id)))
        }
        Ok(StopOutcome::NotFound) => Ok(Json(AgentActionResponse::soft_failure(AGENT_NOT_FOUND))),
        Err(e) => {
            error!(target: "warden-api", agent_id = %request.agent_id, "Stop failed: {}", e);
            Err(ApiError::from(e))
        }
    }
}

/// GET /agents
#[utoipa::path(
    get,
    path = "/agents",
    responses(
        (status = 200, description = "Running agents", body = AgentListResponse)
    ),
    tag = "Agents"
)]
pub async fn list_agents(State(state): State<ApiState>) -> Json<AgentListResponse> {
    let agents: Vec<AgentStatusResponse> = state
        .registry
        .list()
        .into_iter()
        .map(AgentStatusResponse::from)
        .collect();

    Json(AgentListResponse {
        count: agents.len(),
        agents,
    })
}

/// GET /agents/{agent_id}
#[utoipa::path(
    get,
    path = "/agents/{agent_id}",
    params(
        ("agent_id" = String, Path, description = "Agent identifier")
    ),
    responses(
        (status = 200, description = "Agent snapshot", body = AgentStatusResponse),
        (status = 404, description = "No such agent", body = ApiError)
    ),
    tag = "Agents"
)]
pub async fn get_agent(
    State(state): State<ApiState>,
    Path(agent_id): Path<String>,
) -> ApiResult<Json<AgentStatusResponse>> {
    state
        .registry
        .get(&agent_id)
        .map(|info| Json(AgentStatusResponse::from(info)))
        .ok_or_else(|| ApiError::not_found("Agent", agent_id))
}
