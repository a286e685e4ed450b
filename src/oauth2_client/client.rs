// ABOUTME: OAuth2 provider client for the Tesla authorization and token endpoints
// ABOUTME: Defines the OAuthProviderClient seam and its reqwest-backed Tesla implementation
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use reqwest::StatusCode;
use serde_json::json;
use thiserror::Error;
use tracing::{debug, warn};
use url::Url;

use crate::config::TeslaConfig;
use crate::constants::oauth::CODE_CHALLENGE_METHOD;
use crate::constants::tesla::{AUTHORIZE_PATH, REVOKE_PATH, TOKEN_PATH};
use crate::utils::http_client::oauth_client;

use super::token_codec::RawTokenResponse;

/// Failures talking to the provider's `OAuth` endpoints
///
/// Response bodies are logged where they are received and never carried here, so
/// displaying this error cannot leak provider payloads to clients.
#[derive(Debug, Error)]
pub enum OAuthClientError {
    /// Network failure or timeout
    #[error("request to {endpoint} failed: {message}")]
    Transport {
        /// Endpoint that was called
        endpoint: &'static str,
        /// Transport error description
        message: String,
        /// Whether the failure was a timeout
        timed_out: bool,
    },
    /// Provider answered with a non-success status
    #[error("{endpoint} returned HTTP {status}")]
    Status {
        /// Endpoint that was called
        endpoint: &'static str,
        /// HTTP status
        status: u16,
    },
    /// Provider answered 2xx with a body that is not a token response
    #[error("{endpoint} returned an unreadable response")]
    InvalidResponse {
        /// Endpoint that was called
        endpoint: &'static str,
    },
    /// Client misconfiguration (bad base URL)
    #[error("invalid OAuth client configuration: {0}")]
    Configuration(String),
}

impl OAuthClientError {
    /// Whether retrying the same call later may succeed
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        match self {
            Self::Transport { .. } => true,
            Self::Status { status, .. } => *status == 429 || *status >= 500,
            Self::InvalidResponse { .. } | Self::Configuration(_) => false,
        }
    }

    fn transport(endpoint: &'static str, error: &reqwest::Error) -> Self {
        Self::Transport {
            endpoint,
            message: error.to_string(),
            timed_out: error.is_timeout(),
        }
    }
}

/// Provider `OAuth` operations used by the token lifecycle manager and the registrar
///
/// Implementations return raw token responses; decoding (expiry, scopes) happens in
/// the caller with its injected clock.
#[async_trait]
pub trait OAuthProviderClient: Send + Sync {
    /// Provider name used in logs
    fn provider_name(&self) -> &'static str;

    /// Build the user-facing authorization URL for one attempt
    ///
    /// # Errors
    ///
    /// Returns an error if the configured authorization base URL is malformed
    fn authorization_url(&self, state: &str, code_challenge: &str)
        -> Result<String, OAuthClientError>;

    /// Exchange an authorization code and its `PKCE` verifier for tokens
    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<RawTokenResponse, OAuthClientError>;

    /// Obtain new tokens with a refresh token
    async fn refresh_token(&self, refresh_token: &str)
        -> Result<RawTokenResponse, OAuthClientError>;

    /// Revoke a token at the provider
    async fn revoke_token(&self, token: &str) -> Result<(), OAuthClientError>;

    /// Obtain an application (partner) token via `client_credentials`
    async fn client_credentials_token(
        &self,
        scope: &str,
        audience: &str,
    ) -> Result<RawTokenResponse, OAuthClientError>;
}

/// Tesla Fleet API `OAuth` client
///
/// Login and revocation go to the authorization server, every token grant goes to
/// the Fleet auth server with the configured `audience`.
pub struct TeslaOAuthClient {
    config: TeslaConfig,
    client: reqwest::Client,
}

impl TeslaOAuthClient {
    /// Create a client using the shared `OAuth` HTTP client settings
    #[must_use]
    pub fn new(config: TeslaConfig) -> Self {
        Self::with_http_client(config, oauth_client())
    }

    /// Create a client with a caller-supplied HTTP client
    #[must_use]
    pub const fn with_http_client(config: TeslaConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    /// Get the Tesla configuration
    #[must_use]
    pub const fn config(&self) -> &TeslaConfig {
        &self.config
    }

    fn token_url(&self) -> String {
        format!("{}{TOKEN_PATH}", self.config.fleet_auth_url.trim_end_matches('/'))
    }

    fn revoke_url(&self) -> String {
        format!("{}{REVOKE_PATH}", self.config.auth_base_url.trim_end_matches('/'))
    }

    async fn post_token_form(
        &self,
        endpoint: &'static str,
        params: &[(&str, &str)],
    ) -> Result<RawTokenResponse, OAuthClientError> {
        let response = self
            .client
            .post(self.token_url())
            .form(params)
            .send()
            .await
            .map_err(|e| OAuthClientError::transport(endpoint, &e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!(
                endpoint,
                status = status.as_u16(),
                body = %body,
                "Token endpoint rejected request"
            );
            return Err(OAuthClientError::Status {
                endpoint,
                status: status.as_u16(),
            });
        }

        response.json::<RawTokenResponse>().await.map_err(|e| {
            warn!(endpoint, error = %e, "Token endpoint returned an unreadable body");
            OAuthClientError::InvalidResponse { endpoint }
        })
    }
}

#[async_trait]
impl OAuthProviderClient for TeslaOAuthClient {
    fn provider_name(&self) -> &'static str {
        "tesla"
    }

    fn authorization_url(
        &self,
        state: &str,
        code_challenge: &str,
    ) -> Result<String, OAuthClientError> {
        let base = format!(
            "{}{AUTHORIZE_PATH}",
            self.config.auth_base_url.trim_end_matches('/')
        );
        let mut url = Url::parse(&base)
            .map_err(|e| OAuthClientError::Configuration(format!("auth base URL: {e}")))?;

        url.query_pairs_mut()
            .append_pair("response_type", "code")
            .append_pair("client_id", self.config.client_id.as_str())
            .append_pair("redirect_uri", &self.config.redirect_uri)
            .append_pair("scope", &self.config.scopes.join(" "))
            .append_pair("state", state)
            .append_pair("code_challenge", code_challenge)
            .append_pair("code_challenge_method", CODE_CHALLENGE_METHOD);

        Ok(url.to_string())
    }

    async fn exchange_code(
        &self,
        code: &str,
        code_verifier: &str,
    ) -> Result<RawTokenResponse, OAuthClientError> {
        debug!("Exchanging authorization code");
        self.post_token_form(
            "token (authorization_code)",
            &[
                ("grant_type", "authorization_code"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("code", code),
                ("redirect_uri", self.config.redirect_uri.as_str()),
                ("code_verifier", code_verifier),
                ("audience", self.config.audience.as_str()),
            ],
        )
        .await
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<RawTokenResponse, OAuthClientError> {
        debug!("Refreshing access token");
        self.post_token_form(
            "token (refresh_token)",
            &[
                ("grant_type", "refresh_token"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("refresh_token", refresh_token),
                ("audience", self.config.audience.as_str()),
            ],
        )
        .await
    }

    async fn revoke_token(&self, token: &str) -> Result<(), OAuthClientError> {
        const ENDPOINT: &str = "revoke";

        let response = self
            .client
            .post(self.revoke_url())
            .json(&json!({
                "client_id": self.config.client_id,
                "token": token,
            }))
            .send()
            .await
            .map_err(|e| OAuthClientError::transport(ENDPOINT, &e))?;

        let status = response.status();
        if status.is_success() || status == StatusCode::NO_CONTENT {
            return Ok(());
        }

        let body = response.text().await.unwrap_or_default();
        warn!(status = status.as_u16(), body = %body, "Token revocation rejected");
        Err(OAuthClientError::Status {
            endpoint: ENDPOINT,
            status: status.as_u16(),
        })
    }

    async fn client_credentials_token(
        &self,
        scope: &str,
        audience: &str,
    ) -> Result<RawTokenResponse, OAuthClientError> {
        debug!(audience, "Requesting partner token");
        self.post_token_form(
            "token (client_credentials)",
            &[
                ("grant_type", "client_credentials"),
                ("client_id", self.config.client_id.as_str()),
                ("client_secret", self.config.client_secret.as_str()),
                ("audience", audience),
                ("scope", scope),
            ],
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorization_url_carries_pkce_parameters() {
        let client = TeslaOAuthClient::new(TeslaConfig::new(
            "client-123",
            "secret",
            "https://app.example.com/api/v1/auth/tesla/callback",
        ));

        let url = Url::parse(&client.authorization_url("state-abc", "challenge-xyz").unwrap())
            .unwrap();
        assert_eq!(url.host_str(), Some("auth.tesla.com"));
        assert_eq!(url.path(), "/oauth2/v3/authorize");

        let pairs: std::collections::HashMap<_, _> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs["response_type"], "code");
        assert_eq!(pairs["client_id"], "client-123");
        assert_eq!(pairs["state"], "state-abc");
        assert_eq!(pairs["code_challenge"], "challenge-xyz");
        assert_eq!(pairs["code_challenge_method"], "S256");
        assert!(pairs["scope"].starts_with("openid offline_access"));
        assert!(!pairs.contains_key("code_verifier"));
    }

    #[test]
    fn test_retryable_classification() {
        assert!(OAuthClientError::Status {
            endpoint: "token",
            status: 503
        }
        .is_retryable());
        assert!(!OAuthClientError::Status {
            endpoint: "token",
            status: 400
        }
        .is_retryable());
        assert!(!OAuthClientError::InvalidResponse { endpoint: "token" }.is_retryable());
    }
}
