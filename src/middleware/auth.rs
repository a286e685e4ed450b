// ABOUTME: App session authentication for protected HTTP routes
// ABOUTME: Validates the Authorization Bearer JWT and extracts the user context
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use axum::http::HeaderMap;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::auth::AuthManager;
use crate::errors::{AppError, AppResult};

/// Authenticated caller
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthResult {
    /// Authenticated user `ID`
    pub user_id: Uuid,
    /// Email carried by the session
    pub email: String,
}

/// Middleware validating app session tokens
#[derive(Clone)]
pub struct AppSessionAuth {
    auth_manager: Arc<AuthManager>,
}

impl AppSessionAuth {
    /// Create the middleware
    #[must_use]
    pub const fn new(auth_manager: Arc<AuthManager>) -> Self {
        Self { auth_manager }
    }

    /// Authenticate a request from its headers
    ///
    /// # Errors
    ///
    /// - `AUTH_REQUIRED` when no bearer token is present
    /// - `AUTH_EXPIRED` when the session has expired
    /// - `AUTH_INVALID` / `AUTH_MALFORMED` for any other validation failure
    #[tracing::instrument(skip(self, headers), fields(user_id = tracing::field::Empty))]
    pub fn authenticate_request_with_headers(&self, headers: &HeaderMap) -> AppResult<AuthResult> {
        let Some(header) = headers
            .get(http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
        else {
            debug!("Authentication failed: missing authorization header");
            return Err(AppError::auth_required());
        };

        // Security: do not log the header content
        let token = header
            .strip_prefix("Bearer ")
            .or_else(|| header.strip_prefix("bearer "))
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| AppError::auth_invalid("Authorization header must use the Bearer scheme"))?;

        let claims = self.auth_manager.validate_session(token).map_err(|e| {
            warn!("App session rejected: {e}");
            AppError::from(e)
        })?;

        let user_id = claims.user_id()?;
        tracing::Span::current().record("user_id", user_id.to_string());
        Ok(AuthResult {
            user_id,
            email: claims.email,
        })
    }
}
