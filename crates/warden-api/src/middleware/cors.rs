// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// CORS middleware for HTTP API

use tower_http::cors::{Any, CorsLayer};

/// Create CORS layer with permissive settings
///
/// The control panel frontend is served from a different origin than this
/// API, so any origin, method and header is accepted.
pub fn create_cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .allow_credentials(false)
}
