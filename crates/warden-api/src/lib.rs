// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// warden HTTP API layer
//
// Exposes the agent registry over JSON HTTP routes and serves the echo
// WebSocket channel. Endpoint handlers live in `endpoints`; router assembly
// and middleware live in `transports::http::server`.

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod common;
pub mod dtos;
pub mod endpoints;
pub mod middleware;
pub mod openapi;
pub mod transports;

// Re-export commonly used types
pub use common::{ApiError, ApiErrorCode, ApiResult, ApiState, WebSocketSettings};
pub use transports::http::server::create_http_server;
