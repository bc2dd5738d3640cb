// OpenAPI documentation generation
//
// This module generates the OpenAPI 3.0 document at compile-time using
// utoipa, so the documentation stays in sync with the handlers.

use utoipa::OpenApi;

use crate::{
    common::{ApiError, ApiErrorCode},
    dtos::{AgentActionResponse, AgentListResponse, AgentRequest, AgentStatusResponse, HealthResponse},
};

/// OpenAPI documentation for the warden HTTP API
#[derive(OpenApi)]
#[openapi(
    info(
        title = "warden API",
        description = "Start, stop and inspect agent processes",
        license(
            name = "Apache-2.0",
            url = "https://www.apache.org/licenses/LICENSE-2.0"
        )
    ),
    servers(
        (url = "http://localhost:8000", description = "Local development server")
    ),
    paths(
        crate::endpoints::health::health_check,
        crate::endpoints::agent::start_agent,
        crate::endpoints::agent::stop_agent,
        crate::endpoints::agent::list_agents,
        crate::endpoints::agent::get_agent,
    ),
    components(
        schemas(
            AgentRequest,
            AgentActionResponse,
            AgentStatusResponse,
            AgentListResponse,
            HealthResponse,
            ApiError,
            ApiErrorCode,
        )
    ),
    tags(
        (name = "Health", description = "Liveness endpoint"),
        (name = "Agents", description = "Agent process lifecycle"),
    )
)]
pub struct ApiDoc;
