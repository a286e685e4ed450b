// ABOUTME: Token lifecycle manager for the provider OAuth integration
// ABOUTME: Login, callback exchange, transparent refresh with per-user single flight, and logout
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Token Lifecycle Manager
//!
//! Owns every write to a user's provider tokens. Vehicle data adapters only ever see
//! an access token obtained through [`TokenLifecycleManager::get_valid_access_token`],
//! which refreshes transparently once the token is within five minutes of expiry.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{OAuthError, OAuthSession, OAuthSessionStore};
use crate::auth::AuthManager;
use crate::constants::oauth::PLACEHOLDER_USER_NAME;
use crate::database_plugins::DatabaseProvider;
use crate::logging::{AppLogger, LifecycleEvent};
use crate::models::{TokenRecord, User};
use crate::oauth2_client::{
    generate_state, parse_token_response, IdentityClaims, OAuthProviderClient, PkceParams,
    TokenGrant,
};
use crate::utils::clock::Clock;

/// Start of one authorization attempt
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct LoginInitiation {
    /// Provider URL the user agent must be sent to
    pub authorization_url: String,
    /// Correlation value echoed back on the callback
    pub state: String,
}

/// Query parameters of the provider redirect
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CallbackParams {
    /// Authorization code
    pub code: Option<String>,
    /// Correlation value issued by `initiate_login`
    pub state: Option<String>,
    /// Error reported by the provider instead of a code
    pub error: Option<String>,
    /// Human-readable provider error
    pub error_description: Option<String>,
}

/// Result of a completed callback
#[derive(Debug, Clone)]
pub struct CallbackOutcome {
    /// Resolved or newly created user
    pub user: User,
    /// App session token for later requests
    pub app_session_token: String,
    /// Stored provider tokens
    pub token: TokenRecord,
}

/// Token status of a user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct TokenStatus {
    /// Whether provider tokens are stored
    pub authenticated: bool,
    /// Whether the next use will refresh (always true without tokens)
    pub needs_refresh: bool,
    /// Expiry of the stored access token
    pub expires_at: Option<DateTime<Utc>>,
}

/// Coordinates the provider token lifecycle of every user
pub struct TokenLifecycleManager {
    database: Arc<dyn DatabaseProvider>,
    provider: Arc<dyn OAuthProviderClient>,
    sessions: Arc<dyn OAuthSessionStore>,
    clock: Arc<dyn Clock>,
    auth: Arc<AuthManager>,
    refresh_guards: DashMap<Uuid, Arc<Mutex<()>>>,
    serialize_refresh: bool,
}

impl TokenLifecycleManager {
    /// Create a manager over injected collaborators
    ///
    /// With `serialize_refresh` set, concurrent refreshes of the same user coalesce
    /// onto a single provider call. Without it they race and the last write wins.
    #[must_use]
    pub fn new(
        database: Arc<dyn DatabaseProvider>,
        provider: Arc<dyn OAuthProviderClient>,
        sessions: Arc<dyn OAuthSessionStore>,
        clock: Arc<dyn Clock>,
        auth: Arc<AuthManager>,
        serialize_refresh: bool,
    ) -> Self {
        Self {
            database,
            provider,
            sessions,
            clock,
            auth,
            refresh_guards: DashMap::new(),
            serialize_refresh,
        }
    }

    /// Session store in use
    #[must_use]
    pub fn session_store(&self) -> &Arc<dyn OAuthSessionStore> {
        &self.sessions
    }

    /// Start an authorization attempt
    ///
    /// # Errors
    ///
    /// Returns an error if the session cannot be stored or the authorization URL
    /// cannot be built
    pub async fn initiate_login(&self) -> Result<LoginInitiation, OAuthError> {
        let state = generate_state();
        let pkce = PkceParams::generate();

        let authorization_url = self
            .provider
            .authorization_url(&state, &pkce.code_challenge)
            .map_err(|e| OAuthError::Configuration(e.to_string()))?;

        self.sessions
            .put(
                &state,
                OAuthSession::new(state.clone(), pkce.code_verifier, self.clock.now()),
            )
            .await?;

        debug!(backend = self.sessions.backend_name(), "Stored OAuth session");
        Ok(LoginInitiation {
            authorization_url,
            state,
        })
    }

    /// Complete an authorization attempt
    ///
    /// The session is consumed before the code exchange, so a failed exchange still
    /// spends the attempt and the user must start over.
    ///
    /// # Errors
    ///
    /// - [`OAuthError::InvalidRequest`] for a provider error or a missing code/state
    /// - [`OAuthError::SessionExpiredOrUnknown`] for an unknown, replayed or stale state
    /// - [`OAuthError::ProviderExchangeFailed`] if the provider rejects the code
    /// - storage errors from persistence or the session store
    pub async fn handle_callback(
        &self,
        params: &CallbackParams,
    ) -> Result<CallbackOutcome, OAuthError> {
        if let Some(error) = params.error.as_deref() {
            let description = params.error_description.as_deref().unwrap_or("no description");
            warn!(error, description, "Provider reported an authorization error");
            return Err(OAuthError::InvalidRequest(format!(
                "authorization denied: {error}"
            )));
        }

        let code = non_empty(params.code.as_deref())
            .ok_or_else(|| OAuthError::InvalidRequest("missing authorization code".into()))?;
        let state = non_empty(params.state.as_deref())
            .ok_or_else(|| OAuthError::InvalidRequest("missing state parameter".into()))?;

        let session = self
            .sessions
            .consume(state)
            .await?
            .ok_or(OAuthError::SessionExpiredOrUnknown)?;

        let raw = self
            .provider
            .exchange_code(code, &session.code_verifier)
            .await
            .map_err(|e| {
                warn!(provider = self.provider.provider_name(), error = %e, "Code exchange failed");
                OAuthError::ProviderExchangeFailed(e.to_string())
            })?;

        let now = self.clock.now();
        let grant = parse_token_response(&raw, now)
            .map_err(|e| OAuthError::ProviderExchangeFailed(e.to_string()))?;

        let user = self.resolve_user(&grant, now).await?;
        let token = self
            .database
            .upsert_token(&TokenRecord::from_grant(user.id, &grant, now))
            .await?;
        self.database.update_last_login(user.id, now).await?;

        let app_session_token = self
            .auth
            .generate_token(&user)
            .map_err(|e| OAuthError::Configuration(e.message))?;

        AppLogger::log_oauth_event(
            user.id,
            self.provider.provider_name(),
            LifecycleEvent::Callback,
            true,
        );
        info!(user_id = %user.id, expires_at = %token.expires_at, "Provider tokens stored");

        Ok(CallbackOutcome {
            user: User {
                last_login_at: Some(now),
                ..user
            },
            app_session_token,
            token,
        })
    }

    /// Get an access token valid for at least the expiry margin, refreshing if needed
    ///
    /// # Errors
    ///
    /// - [`OAuthError::NoTokensFound`] if the user never connected
    /// - [`OAuthError::ProviderRefreshFailed`] if a needed refresh fails; the stored
    ///   record is left untouched
    pub async fn get_valid_access_token(&self, user_id: Uuid) -> Result<String, OAuthError> {
        let record = self.load(user_id).await?;
        if !record.is_expired_at(self.clock.now()) {
            return Ok(record.access_token);
        }

        if !self.serialize_refresh {
            return Ok(self.refresh_record(&record).await?.access_token);
        }

        let guard = self.refresh_guard(user_id);
        let result = async {
            let _lock = guard.lock().await;

            // Another caller may have refreshed while we waited on the guard
            let record = self.load(user_id).await?;
            if !record.is_expired_at(self.clock.now()) {
                debug!(user_id = %user_id, "Token refreshed by a concurrent caller");
                return Ok(record.access_token);
            }
            Ok::<_, OAuthError>(self.refresh_record(&record).await?.access_token)
        }
        .await;

        self.release_refresh_guard(user_id, guard);
        result
    }

    /// Number of users with a refresh guard currently allocated
    #[must_use]
    pub fn refresh_guard_count(&self) -> usize {
        self.refresh_guards.len()
    }

    /// Refresh now regardless of expiry
    ///
    /// # Errors
    ///
    /// - [`OAuthError::NoTokensFound`] if the user never connected
    /// - [`OAuthError::ProviderRefreshFailed`] if the refresh fails
    pub async fn refresh(&self, user_id: Uuid) -> Result<TokenRecord, OAuthError> {
        if !self.serialize_refresh {
            let record = self.load(user_id).await?;
            return self.refresh_record(&record).await;
        }

        let guard = self.refresh_guard(user_id);
        let result = async {
            let _lock = guard.lock().await;
            let record = self.load(user_id).await?;
            self.refresh_record(&record).await
        }
        .await;
        self.release_refresh_guard(user_id, guard);
        result
    }

    /// Revoke at the provider (best effort) and forget the user's tokens
    ///
    /// # Errors
    ///
    /// Returns an error only if persistence fails
    pub async fn logout(&self, user_id: Uuid) -> Result<(), OAuthError> {
        if let Some(record) = self.database.get_token(user_id).await? {
            if let Err(e) = self.provider.revoke_token(&record.access_token).await {
                let error = OAuthError::RevokeFailed(e.to_string());
                warn!(user_id = %user_id, error = %error, "Continuing logout without revocation");
            }
        }

        let deleted = self.database.delete_token(user_id).await?;
        self.refresh_guards.remove(&user_id);

        AppLogger::log_oauth_event(
            user_id,
            self.provider.provider_name(),
            LifecycleEvent::Logout,
            true,
        );
        debug!(user_id = %user_id, deleted, "Provider tokens removed");
        Ok(())
    }

    /// Describe the stored tokens of a user
    ///
    /// # Errors
    ///
    /// Returns an error if persistence fails
    pub async fn status(&self, user_id: Uuid) -> Result<TokenStatus, OAuthError> {
        Ok(match self.database.get_token(user_id).await? {
            Some(record) => TokenStatus {
                authenticated: true,
                needs_refresh: record.is_expired_at(self.clock.now()),
                expires_at: Some(record.expires_at),
            },
            None => TokenStatus {
                authenticated: false,
                needs_refresh: true,
                expires_at: None,
            },
        })
    }

    async fn load(&self, user_id: Uuid) -> Result<TokenRecord, OAuthError> {
        self.database
            .get_token(user_id)
            .await?
            .ok_or(OAuthError::NoTokensFound(user_id))
    }

    fn refresh_guard(&self, user_id: Uuid) -> Arc<Mutex<()>> {
        Arc::clone(self.refresh_guards.entry(user_id).or_default().value())
    }

    /// Drop the map entry once no other caller holds or waits on the guard
    fn release_refresh_guard(&self, user_id: Uuid, guard: Arc<Mutex<()>>) {
        drop(guard);
        self.refresh_guards
            .remove_if(&user_id, |_, held| Arc::strong_count(held) == 1);
    }

    /// Refresh `record` at the provider and persist the result
    ///
    /// Nothing is written unless the provider returns a usable grant.
    async fn refresh_record(&self, record: &TokenRecord) -> Result<TokenRecord, OAuthError> {
        let user_id = record.user_id;
        let refresh_token = record.refresh_token.as_deref().ok_or_else(|| {
            OAuthError::ProviderRefreshFailed("no refresh token stored, re-authenticate".into())
        })?;

        info!(user_id = %user_id, "Refreshing provider access token");
        let raw = self.provider.refresh_token(refresh_token).await.map_err(|e| {
            warn!(user_id = %user_id, error = %e, retryable = e.is_retryable(), "Token refresh failed");
            AppLogger::log_oauth_event(
                user_id,
                self.provider.provider_name(),
                LifecycleEvent::Refresh,
                false,
            );
            OAuthError::ProviderRefreshFailed(e.to_string())
        })?;

        let now = self.clock.now();
        let grant = parse_token_response(&raw, now)
            .map_err(|e| OAuthError::ProviderRefreshFailed(e.to_string()))?;

        let mut updated = TokenRecord::from_grant(user_id, &grant, now);
        if updated.scopes.is_empty() {
            updated.scopes.clone_from(&record.scopes);
        }
        let stored = self.database.upsert_token(&updated).await?;

        AppLogger::log_oauth_event(
            user_id,
            self.provider.provider_name(),
            LifecycleEvent::Refresh,
            true,
        );
        Ok(stored)
    }

    /// Find the user behind a grant, creating one on first login
    async fn resolve_user(&self, grant: &TokenGrant, now: DateTime<Utc>) -> Result<User, OAuthError> {
        let claims = grant
            .id_token
            .as_deref()
            .and_then(IdentityClaims::from_id_token)
            .unwrap_or_default();

        if let Some(sub) = claims.sub.as_deref() {
            if let Some(user) = self.database.get_user_by_external_id(sub).await? {
                return Ok(user);
            }
        }
        if let Some(email) = claims.email.as_deref() {
            if let Some(user) = self.database.get_user_by_email(email).await? {
                return Ok(user);
            }
        }

        let user = match claims.email {
            Some(email) => User::new(
                email,
                claims
                    .name
                    .unwrap_or_else(|| PLACEHOLDER_USER_NAME.to_owned()),
                claims.sub,
                now,
            ),
            None => User::placeholder(claims.sub, now),
        };
        self.database.create_user(&user).await?;
        info!(user_id = %user.id, placeholder = user.has_placeholder_email(), "Created user on first login");
        Ok(user)
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.trim().is_empty())
}
