// ABOUTME: Broker-wide error type with stable error codes and HTTP response mapping
// ABOUTME: AppError renders as the {success:false, error:{...}} body through axum IntoResponse
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Error codes and the `AppError` type returned by route handlers
//!
//! Domain errors (`OAuthError`, `ProviderError`, `SessionTokenError`) pick an
//! [`ErrorCode`] and convert into `AppError` at the route boundary. Messages never
//! carry provider response bodies or token material.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Stable machine-readable error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// No app session presented
    AuthRequired,
    /// App session signature or claims rejected
    AuthInvalid,
    /// App session past its expiry
    AuthExpired,
    /// App session token is not a `JWT`
    AuthMalformed,
    /// No vehicle account is linked for the user
    ProviderNotConnected,
    /// Request input invalid
    InvalidInput,
    /// Login attempt unknown, consumed or expired
    #[serde(rename = "OAUTH_STATE_INVALID")]
    OAuthStateInvalid,
    /// Resource does not exist or belongs to someone else
    ResourceNotFound,
    /// Vehicle asleep or otherwise temporarily unreachable
    ResourceUnavailable,
    /// Tesla answered with an error
    ExternalServiceError,
    /// Tesla could not be reached
    ExternalServiceUnavailable,
    /// Tesla rejected the stored credentials
    ExternalAuthFailed,
    /// Broker misconfigured
    ConfigError,
    /// Unexpected failure
    InternalError,
    /// Database failure
    DatabaseError,
    /// Session store failure
    StorageError,
    /// Payload could not be encoded or decoded
    SerializationError,
}

impl ErrorCode {
    /// HTTP status for responses carrying this code
    #[must_use]
    pub const fn status(self) -> StatusCode {
        match self {
            Self::InvalidInput | Self::OAuthStateInvalid => StatusCode::BAD_REQUEST,
            Self::AuthRequired
            | Self::AuthInvalid
            | Self::AuthExpired
            | Self::AuthMalformed
            | Self::ProviderNotConnected => StatusCode::UNAUTHORIZED,
            Self::ResourceNotFound => StatusCode::NOT_FOUND,
            Self::ExternalServiceError => StatusCode::BAD_GATEWAY,
            Self::ResourceUnavailable
            | Self::ExternalServiceUnavailable
            | Self::ExternalAuthFailed => StatusCode::SERVICE_UNAVAILABLE,
            Self::ConfigError
            | Self::InternalError
            | Self::DatabaseError
            | Self::StorageError
            | Self::SerializationError => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

/// Error returned by route handlers and the persistence layer
#[derive(Debug, Error)]
#[error("{message}")]
pub struct AppError {
    /// Error code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Correlation id echoed in the body when known
    pub request_id: Option<String>,
    /// User the failure concerns, logged but never rendered
    pub user_id: Option<Uuid>,
}

/// Result alias used by the persistence layer and handlers
pub type AppResult<T> = Result<T, AppError>;

impl AppError {
    /// Create an error with the given code and message
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            request_id: None,
            user_id: None,
        }
    }

    /// Attach the request correlation id
    #[must_use]
    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Attach the affected user
    #[must_use]
    pub const fn with_user_id(mut self, user_id: Uuid) -> Self {
        self.user_id = Some(user_id);
        self
    }

    /// HTTP status code as a number
    #[must_use]
    pub const fn http_status(&self) -> u16 {
        self.code.status().as_u16()
    }

    /// No bearer token on a protected route
    #[must_use]
    pub fn auth_required() -> Self {
        Self::new(ErrorCode::AuthRequired, "Authentication required")
    }

    /// Bearer token rejected
    pub fn auth_invalid(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::AuthInvalid, message)
    }

    /// Bearer token expired
    #[must_use]
    pub fn auth_expired() -> Self {
        Self::new(ErrorCode::AuthExpired, "Authentication token has expired")
    }

    /// Named resource not found
    pub fn not_found(resource: impl Into<String>) -> Self {
        Self::new(
            ErrorCode::ResourceNotFound,
            format!("{} not found", resource.into()),
        )
    }

    /// Bad request input
    pub fn invalid_input(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InvalidInput, message)
    }

    /// Unexpected failure
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::InternalError, message)
    }

    /// Database failure
    pub fn database(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::DatabaseError, message)
    }

    /// Session store failure
    pub fn storage(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::StorageError, message)
    }

    /// Broker misconfiguration
    pub fn config(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::ConfigError, message)
    }
}

/// Body of every error response
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Always `false`
    pub success: bool,
    /// Error payload
    pub error: ErrorBody,
}

/// Error payload of an [`ErrorResponse`]
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable code
    pub code: ErrorCode,
    /// Human-readable message
    pub message: String,
    /// Correlation id when known
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl From<AppError> for ErrorResponse {
    fn from(error: AppError) -> Self {
        Self {
            success: false,
            error: ErrorBody {
                code: error.code,
                message: error.message,
                request_id: error.request_id,
            },
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.code.status();

        if status.is_server_error() {
            tracing::error!(
                code = ?self.code,
                user_id = ?self.user_id,
                message = %self.message,
                "Request failed"
            );
        } else {
            tracing::debug!(
                code = ?self.code,
                user_id = ?self.user_id,
                message = %self.message,
                "Request rejected"
            );
        }

        (status, Json(ErrorResponse::from(self))).into_response()
    }
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::internal(format!("{error:#}"))
    }
}

impl From<sqlx::Error> for AppError {
    fn from(error: sqlx::Error) -> Self {
        Self::database(error.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(error: serde_json::Error) -> Self {
        Self::new(ErrorCode::SerializationError, error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codes_map_to_statuses() {
        assert_eq!(ErrorCode::AuthRequired.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::OAuthStateInvalid.status(), StatusCode::BAD_REQUEST);
        assert_eq!(ErrorCode::ProviderNotConnected.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(ErrorCode::ExternalServiceError.status(), StatusCode::BAD_GATEWAY);
        assert_eq!(
            ErrorCode::ExternalAuthFailed.status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(AppError::storage("down").http_status(), 500);
    }

    #[test]
    fn test_error_body_shape() {
        let error = AppError::invalid_input("Missing code or state parameter")
            .with_request_id("req-123")
            .with_user_id(Uuid::new_v4());
        let body = serde_json::to_value(ErrorResponse::from(error)).unwrap();

        assert_eq!(body["success"], false);
        assert_eq!(body["error"]["code"], "INVALID_INPUT");
        assert_eq!(body["error"]["request_id"], "req-123");
        assert!(body["error"].get("userId").is_none());
        assert!(body["error"].get("user_id").is_none());
    }

    #[test]
    fn test_state_code_name() {
        let value = serde_json::to_value(ErrorCode::OAuthStateInvalid).unwrap();
        assert_eq!(value, "OAUTH_STATE_INVALID");
    }

    #[test]
    fn test_into_response_uses_code_status() {
        let response = AppError::not_found("Vehicle").into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }
}
