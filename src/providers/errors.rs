// ABOUTME: Structured error types for vehicle data provider operations
// ABOUTME: Distinguishes auth failures, sleeping vehicles and transport errors with retry information
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use thiserror::Error;

use crate::errors::{AppError, ErrorCode};

/// Vehicle data provider failures
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The provider rejected the access token (HTTP 401/403)
    #[error("{provider} rejected the access token (HTTP {status})")]
    AuthFailed {
        /// Provider name
        provider: &'static str,
        /// HTTP status
        status: u16,
    },

    /// The vehicle did not answer in time, usually because it is asleep
    #[error("Vehicle may be asleep, wake it and try again")]
    VehicleAsleep,

    /// The provider does not know the vehicle
    #[error("Vehicle {0} not found at provider")]
    NotFound(String),

    /// Network failure or timeout
    #[error("{provider} request failed: {message}")]
    Transport {
        /// Provider name
        provider: &'static str,
        /// Transport error description
        message: String,
        /// Whether the failure was a timeout
        timed_out: bool,
    },

    /// Provider answered with another non-success status
    #[error("{provider} API error (HTTP {status}): {message}")]
    ApiError {
        /// Provider name
        provider: &'static str,
        /// HTTP status
        status: u16,
        /// Provider error message
        message: String,
    },

    /// Provider answered 2xx with a body we cannot read
    #[error("{provider} returned an invalid response: {details}")]
    InvalidResponse {
        /// Provider name
        provider: &'static str,
        /// What was wrong
        details: String,
    },
}

impl ProviderError {
    /// Whether retrying the same call later may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::VehicleAsleep | Self::Transport { .. } => true,
            Self::ApiError { status, .. } => *status == 429 || *status >= 500,
            Self::AuthFailed { .. } | Self::NotFound(_) | Self::InvalidResponse { .. } => false,
        }
    }

    const fn error_code(&self) -> ErrorCode {
        match self {
            Self::AuthFailed { .. } => ErrorCode::ExternalAuthFailed,
            Self::VehicleAsleep => ErrorCode::ResourceUnavailable,
            Self::NotFound(_) => ErrorCode::ResourceNotFound,
            Self::Transport { .. } => ErrorCode::ExternalServiceUnavailable,
            Self::ApiError { .. } | Self::InvalidResponse { .. } => ErrorCode::ExternalServiceError,
        }
    }
}

impl From<ProviderError> for AppError {
    fn from(error: ProviderError) -> Self {
        Self::new(error.error_code(), error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        let cases = [
            (
                ProviderError::AuthFailed {
                    provider: "tesla",
                    status: 401,
                },
                503,
            ),
            (ProviderError::VehicleAsleep, 503),
            (ProviderError::NotFound("42".into()), 404),
            (
                ProviderError::ApiError {
                    provider: "tesla",
                    status: 500,
                    message: "boom".into(),
                },
                502,
            ),
        ];

        for (error, status) in cases {
            assert_eq!(AppError::from(error).http_status(), status);
        }
    }

    #[test]
    fn test_retryable() {
        assert!(ProviderError::VehicleAsleep.is_retryable());
        assert!(!ProviderError::AuthFailed {
            provider: "tesla",
            status: 403
        }
        .is_retryable());
    }
}
