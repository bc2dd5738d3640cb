// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// Liveness endpoint

use axum::Json;

use crate::dtos::HealthResponse;

/// GET /health
///
/// Liveness probe; answers "ok" whatever the registry holds
#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Server is up", body = HealthResponse)
    ),
    tag = "Health"
)]
pub async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}
