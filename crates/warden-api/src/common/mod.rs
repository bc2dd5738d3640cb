// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

// Common types shared by the HTTP endpoints and the WebSocket channel

pub mod error;
pub mod state;

pub use error::{ApiError, ApiErrorCode};
pub use state::{ApiState, WebSocketSettings};

/// Result type for API operations
pub type ApiResult<T> = Result<T, ApiError>;
