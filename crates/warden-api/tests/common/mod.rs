// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// Shared helpers for the API integration tests

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;
use warden_agent_registry::{
    AgentCommand, AgentRegistry, CommandLauncher, OutputMode, RegistrySettings,
};
use warden_api::{create_http_server, ApiState, WebSocketSettings};

/// Registry whose agents are long `sleep` processes
pub fn sleeper_registry(settings: RegistrySettings) -> Arc<AgentRegistry> {
    let command = AgentCommand::new("sleep")
        .with_args(["30"])
        .with_output(OutputMode::Discard);
    Arc::new(AgentRegistry::new(
        Arc::new(CommandLauncher::new(command)),
        settings,
    ))
}

pub fn registry_for(command: AgentCommand) -> Arc<AgentRegistry> {
    registry_with(
        command,
        RegistrySettings {
            stop_timeout: Duration::from_secs(2),
            ..RegistrySettings::default()
        },
    )
}

pub fn registry_with(command: AgentCommand, settings: RegistrySettings) -> Arc<AgentRegistry> {
    Arc::new(AgentRegistry::new(
        Arc::new(CommandLauncher::new(command)),
        settings,
    ))
}

pub fn app(registry: Arc<AgentRegistry>, websocket: WebSocketSettings) -> Router {
    create_http_server(ApiState::new(registry, websocket))
}

pub async fn post_json(app: &Router, uri: &str, body: Value) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap();
    send(app, request).await
}

pub async fn post_raw(app: &Router, uri: &str, body: &'static str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body))
        .unwrap();
    send(app, request).await
}

pub async fn get_json(app: &Router, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder().uri(uri).body(Body::empty()).unwrap();
    send(app, request).await
}

pub async fn request(app: &Router, method: &str, uri: &str) -> (StatusCode, Value) {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap();
    send(app, request).await
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
}
