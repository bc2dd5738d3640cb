// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// HTTP server implementation (Axum)
//
// This module sets up the HTTP API router: routes, middleware and shared state.

use axum::{
    response::{IntoResponse, Json},
    routing::{get, post},
    Router,
};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::common::{ApiError, ApiErrorCode, ApiState};
use crate::endpoints::{agent, health};
use crate::middleware::cors::create_cors_layer;
use crate::openapi::ApiDoc;
use crate::transports::websocket;

/// Create the main HTTP server application
pub fn create_http_server(state: ApiState) -> Router {
    let mut router = Router::new()
        .route("/start-agent", post(agent::start_agent))
        .route("/stop-agent", post(agent::stop_agent))
        .route("/agents", get(agent::list_agents))
        .route("/agents/:agent_id", get(agent::get_agent))
        .route("/health", get(health::health_check))
        // OpenAPI document
        .route("/api-docs/openapi.json", get(|| async { Json(ApiDoc::openapi()) }));

    if state.websocket.enabled {
        router = router.route("/ws", get(websocket::ws_handler));
    } else {
        tracing::info!(target: "warden-api", "WebSocket echo channel disabled");
    }

    router
        .method_not_allowed_fallback(method_not_allowed)
        .fallback(not_found)
        .with_state(state)
        .layer(create_cors_layer())
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::span!(
                        target: "warden-api",
                        tracing::Level::DEBUG,
                        "request",
                        method = %request.method(),
                        uri = %request.uri(),
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_request(|request: &axum::http::Request<_>, _span: &tracing::Span| {
                    tracing::debug!(target: "warden-api", "Incoming request: {} {}", request.method(), request.uri());
                })
                .on_response(|response: &axum::http::Response<_>, latency: std::time::Duration, span: &tracing::Span| {
                    span.record("status", response.status().as_u16());
                    span.record("latency_ms", latency.as_millis() as u64);
                    tracing::debug!(
                        target: "warden-api",
                        "Response: status={}, latency={:?}",
                        response.status(),
                        latency
                    );
                })
                .on_failure(|error: tower_http::classify::ServerErrorsFailureClass, latency: std::time::Duration, _span: &tracing::Span| {
                    tracing::error!(target: "warden-api", "Request failed: {}, latency={:?}", error, latency);
                }),
        )
}

async fn not_found(uri: axum::http::Uri) -> impl IntoResponse {
    tracing::warn!(target: "warden-api", "Unmatched request - 404 Not Found: {}", uri);
    ApiError::new("Not found").with_code(ApiErrorCode::NotFound)
}

async fn method_not_allowed(method: axum::http::Method, uri: axum::http::Uri) -> impl IntoResponse {
    tracing::warn!(target: "warden-api", "Method not allowed - 405: {} {}", method, uri);
    ApiError::new(format!("Method {} not allowed", method)).with_code(ApiErrorCode::MethodNotAllowed)
}
