// ABOUTME: OAuth login, callback, refresh, logout and status route handlers
// ABOUTME: Thin HTTP layer delegating to the token lifecycle manager
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Authentication routes
//!
//! The callback either redirects to the configured app URL with the app session
//! token in the query, or answers with JSON when no app URL is configured.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use url::Url;
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::logging::{AppLogger, LifecycleEvent};
use crate::models::{TokenSummary, User};
use crate::oauth::{CallbackOutcome, CallbackParams};
use crate::resources::ServerResources;

/// Public view of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct UserInfo {
    /// User id
    pub id: Uuid,
    /// Email
    pub email: String,
    /// Display name
    pub name: String,
}

impl From<&User> for UserInfo {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            name: user.name.clone(),
        }
    }
}

/// Login initiation response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    /// Always true
    pub success: bool,
    /// Provider authorization URL
    pub auth_url: String,
    /// Correlation value of this attempt
    pub state: String,
    /// Hint for the client
    pub message: String,
}

/// Callback response when no app redirect is configured
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackResponse {
    /// Always true
    pub success: bool,
    /// App session token
    pub token: String,
    /// Logged in user
    pub user: UserInfo,
    /// Stored provider token metadata
    pub provider_token: TokenSummary,
    /// Human-readable outcome
    pub message: String,
}

/// Refresh response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshResponse {
    /// Always true
    pub success: bool,
    /// New provider token expiry
    pub expires_at: DateTime<Utc>,
    /// Human-readable outcome
    pub message: String,
}

/// Status response
#[derive(Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    /// Always true
    pub success: bool,
    /// Current user
    pub user: UserInfo,
    /// Whether provider tokens are stored
    pub is_authenticated: bool,
    /// Whether the next use will refresh
    pub needs_refresh: bool,
    /// Provider token expiry
    pub expires_at: Option<DateTime<Utc>>,
}

/// Authentication routes
pub struct AuthRoutes;

impl AuthRoutes {
    /// Create all authentication routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/auth/tesla/login", get(Self::handle_login))
            .route("/auth/tesla/callback", get(Self::handle_callback))
            .route("/auth/refresh", post(Self::handle_refresh))
            .route("/auth/logout", post(Self::handle_logout))
            .route("/auth/status", get(Self::handle_status))
            .with_state(resources)
    }

    async fn handle_login(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let login = resources.token_manager.initiate_login().await?;

        Ok((
            StatusCode::OK,
            Json(LoginResponse {
                success: true,
                auth_url: login.authorization_url,
                state: login.state,
                message: "Redirect user to authUrl to complete Tesla authentication".into(),
            }),
        )
            .into_response())
    }

    async fn handle_callback(
        State(resources): State<Arc<ServerResources>>,
        Query(params): Query<CallbackParams>,
    ) -> Result<Response, AppError> {
        let outcome = resources.token_manager.handle_callback(&params).await?;
        AppLogger::log_auth_event(outcome.user.id, LifecycleEvent::SessionIssued, None);

        match resources.config.app_callback_url.as_deref() {
            Some(app_url) => {
                let location = Self::app_redirect_url(app_url, &outcome)?;
                info!(user_id = %outcome.user.id, "Redirecting to app after login");
                Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
            }
            None => Ok((
                StatusCode::OK,
                Json(CallbackResponse {
                    success: true,
                    user: UserInfo::from(&outcome.user),
                    provider_token: TokenSummary::from(&outcome.token),
                    token: outcome.app_session_token,
                    message: "Authentication successful".into(),
                }),
            )
                .into_response()),
        }
    }

    async fn handle_refresh(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;
        let record = resources.token_manager.refresh(auth.user_id).await?;

        Ok((
            StatusCode::OK,
            Json(RefreshResponse {
                success: true,
                expires_at: record.expires_at,
                message: "Token refreshed successfully".into(),
            }),
        )
            .into_response())
    }

    async fn handle_logout(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;
        resources.token_manager.logout(auth.user_id).await?;

        Ok((
            StatusCode::OK,
            Json(serde_json::json!({
                "success": true,
                "message": "Logged out successfully",
            })),
        )
            .into_response())
    }

    async fn handle_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;

        let user = resources
            .database
            .get_user(auth.user_id)
            .await?
            .ok_or_else(|| AppError::not_found("User"))?;
        let status = resources.token_manager.status(auth.user_id).await?;

        Ok((
            StatusCode::OK,
            Json(StatusResponse {
                success: true,
                user: UserInfo::from(&user),
                is_authenticated: status.authenticated,
                needs_refresh: status.needs_refresh,
                expires_at: status.expires_at,
            }),
        )
            .into_response())
    }

    fn app_redirect_url(app_url: &str, outcome: &CallbackOutcome) -> AppResult<String> {
        let mut url = Url::parse(app_url)
            .map_err(|e| AppError::config(format!("APP_CALLBACK_URL is not a valid URL: {e}")))?;
        url.query_pairs_mut()
            .append_pair("token", &outcome.app_session_token)
            .append_pair("userId", &outcome.user.id.to_string());
        Ok(url.to_string())
    }
}
