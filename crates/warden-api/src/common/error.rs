// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

use std::fmt;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use utoipa::ToSchema;
use warden_agent_registry::RegistryError;

/// API error codes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ApiErrorCode {
    NotFound,
    MethodNotAllowed,
    PayloadTooLarge,
    InvalidInput,
    Internal,
    ServiceUnavailable,
}

impl ApiErrorCode {
    pub fn status(self) -> StatusCode {
        match self {
            ApiErrorCode::NotFound => StatusCode::NOT_FOUND,
            ApiErrorCode::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            ApiErrorCode::PayloadTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiErrorCode::InvalidInput => StatusCode::UNPROCESSABLE_ENTITY,
            ApiErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
            ApiErrorCode::ServiceUnavailable => StatusCode::SERVICE_UNAVAILABLE,
        }
    }
}

/// API error body for fatal outcomes (uses FastAPI's "detail" field)
#[derive(Debug, Error, Clone, Serialize, Deserialize, ToSchema)]
pub struct ApiError {
    /// Error detail message
    pub detail: String,

    /// Error code
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<ApiErrorCode>,

    /// Additional error details
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.detail)
    }
}

impl ApiError {
    pub fn new(detail: impl Into<String>) -> Self {
        Self {
            detail: detail.into(),
            code: None,
            details: None,
        }
    }

    pub fn with_code(mut self, code: ApiErrorCode) -> Self {
        self.code = Some(code);
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        let resource = resource.into();
        let id = id.into();
        Self::new(format!("{} '{}' not found", resource, id))
            .with_code(ApiErrorCode::NotFound)
            .with_details(serde_json::json!({
                "resource": resource,
                "id": id
            }))
    }

    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ApiErrorCode::InvalidInput)
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ApiErrorCode::Internal)
    }

    pub fn service_unavailable(message: impl Into<String>) -> Self {
        Self::new(message).with_code(ApiErrorCode::ServiceUnavailable)
    }

    /// HTTP status for this error (500 when no code is set)
    pub fn status(&self) -> StatusCode {
        self.code
            .map(ApiErrorCode::status)
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (self.status(), Json(self)).into_response()
    }
}

/// Convert registry errors to API errors
impl From<RegistryError> for ApiError {
    fn from(err: RegistryError) -> Self {
        let detail = err.to_string();
        match err {
            RegistryError::SpawnFailed { agent_id, .. }
            | RegistryError::TerminationFailed { agent_id, .. } => {
                ApiError::internal(detail).with_details(serde_json::json!({ "agent_id": agent_id }))
            }
            RegistryError::StopTimedOut { agent_id, waited } => ApiError::internal(detail)
                .with_details(serde_json::json!({
                    "agent_id": agent_id,
                    "waited_ms": waited.as_millis() as u64
                })),
            RegistryError::CapacityReached(max) => ApiError::service_unavailable(detail)
                .with_details(serde_json::json!({ "max_agents": max })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;
    use std::time::Duration;

    #[test]
    fn test_error_serialization_omits_empty_fields() {
        let json = serde_json::to_value(ApiError::new("boom")).unwrap();
        assert_eq!(json, serde_json::json!({ "detail": "boom" }));

        let json = serde_json::to_value(ApiError::not_found("Agent", "a")).unwrap();
        assert_eq!(json["code"], "NOT_FOUND");
        assert_eq!(json["details"]["id"], "a");
    }

    #[test]
    fn test_registry_error_mapping() {
        let spawn = ApiError::from(RegistryError::SpawnFailed {
            agent_id: "a".to_string(),
            source: io::Error::new(io::ErrorKind::NotFound, "missing"),
        });
        assert_eq!(spawn.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(spawn.detail.contains("missing"));
        assert_eq!(spawn.details.unwrap()["agent_id"], "a");

        let timed_out = ApiError::from(RegistryError::StopTimedOut {
            agent_id: "a".to_string(),
            waited: Duration::from_secs(2),
        });
        assert_eq!(timed_out.code, Some(ApiErrorCode::Internal));
        assert_eq!(timed_out.details.unwrap()["waited_ms"], 2000);

        let full = ApiError::from(RegistryError::CapacityReached(4));
        assert_eq!(full.status(), StatusCode::SERVICE_UNAVAILABLE);
    }

    #[test]
    fn test_code_status_mapping() {
        assert_eq!(ApiErrorCode::MethodNotAllowed.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(ApiErrorCode::PayloadTooLarge.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(
            serde_json::to_value(ApiErrorCode::PayloadTooLarge).unwrap(),
            "PAYLOAD_TOO_LARGE"
        );
    }

    #[test]
    fn test_status_without_code_is_internal() {
        assert_eq!(ApiError::new("x").status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            ApiError::invalid_input("x").status(),
            StatusCode::UNPROCESSABLE_ENTITY
        );
    }
}
