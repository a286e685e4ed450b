// ABOUTME: One-time partner account registration with the Fleet API
// ABOUTME: Uses a client_credentials partner token and treats HTTP 409 as already registered
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{error, info, warn};

use super::OAuthError;
use crate::constants::tesla::{
    PARTNER_ACCOUNTS_PATH, PARTNER_PUBLIC_KEY_PATH, PARTNER_SCOPES, VIRTUAL_KEY_BASE_URL,
};
use crate::oauth2_client::{parse_token_response, OAuthProviderClient};
use crate::utils::clock::Clock;
use crate::utils::http_client::authorized_request;

/// Outcome of a registration call
#[derive(Debug, Clone, PartialEq)]
pub enum RegistrationResult {
    /// Newly registered; carries the provider response body
    Registered(Value),
    /// The provider already knew the domain (HTTP 409)
    AlreadyRegistered,
}

/// Registration state reported by the provider
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct RegistrationStatus {
    /// Whether the domain is registered
    pub registered: bool,
    /// Domain that was checked
    pub domain: String,
    /// Public key information, when registered
    pub public_key: Option<Value>,
}

/// Registers this application's domain with the Fleet API
pub struct PartnerRegistrar {
    provider: Arc<dyn OAuthProviderClient>,
    http: reqwest::Client,
    api_base_url: String,
    audience: String,
    clock: Arc<dyn Clock>,
    registered: AtomicBool,
}

impl PartnerRegistrar {
    /// Create a registrar talking to `api_base_url`
    #[must_use]
    pub fn new(
        provider: Arc<dyn OAuthProviderClient>,
        http: reqwest::Client,
        api_base_url: impl Into<String>,
        audience: impl Into<String>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            provider,
            http,
            api_base_url: api_base_url.into().trim_end_matches('/').to_owned(),
            audience: audience.into(),
            clock,
            registered: AtomicBool::new(false),
        }
    }

    /// Whether a registration succeeded in this process
    #[must_use]
    pub fn is_registered(&self) -> bool {
        self.registered.load(Ordering::Acquire)
    }

    /// Link the vehicle owner opens to pair the virtual key
    #[must_use]
    pub fn virtual_key_url(domain: &str) -> String {
        format!("{VIRTUAL_KEY_BASE_URL}/{domain}")
    }

    /// Register `domain` as a partner account
    ///
    /// Registering an already known domain succeeds with
    /// [`RegistrationResult::AlreadyRegistered`].
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::RegistrationFailed`] if the partner token cannot be
    /// obtained or the provider rejects the registration
    pub async fn register_domain(&self, domain: &str) -> Result<RegistrationResult, OAuthError> {
        let partner_token = self.partner_token().await?;
        let url = format!("{}{PARTNER_ACCOUNTS_PATH}", self.api_base_url);

        let response = authorized_request(&self.http, Method::POST, &url, &partner_token)
            .json(&json!({ "domain": domain }))
            .send()
            .await
            .map_err(|e| OAuthError::RegistrationFailed(format!("request failed: {e}")))?;

        let status = response.status();
        let result = if status.is_success() {
            let body = response.json::<Value>().await.unwrap_or(Value::Null);
            info!(domain, "Partner domain registered");
            RegistrationResult::Registered(body)
        } else if status == StatusCode::CONFLICT {
            info!(domain, "Partner domain already registered");
            RegistrationResult::AlreadyRegistered
        } else {
            let body = response.text().await.unwrap_or_default();
            warn!(domain, status = status.as_u16(), body = %body, "Partner registration rejected");
            return Err(OAuthError::RegistrationFailed(format!(
                "HTTP {}",
                status.as_u16()
            )));
        };

        self.registered.store(true, Ordering::Release);
        Ok(result)
    }

    /// Ask the provider whether `domain` is registered
    ///
    /// # Errors
    ///
    /// Returns [`OAuthError::RegistrationFailed`] if the partner token cannot be
    /// obtained or the provider answers with anything but 200 or 404
    pub async fn registration_status(&self, domain: &str) -> Result<RegistrationStatus, OAuthError> {
        let partner_token = self.partner_token().await?;
        let url = format!("{}{PARTNER_PUBLIC_KEY_PATH}", self.api_base_url);

        let response = authorized_request(&self.http, Method::GET, &url, &partner_token)
            .query(&[("domain", domain)])
            .send()
            .await
            .map_err(|e| OAuthError::RegistrationFailed(format!("request failed: {e}")))?;

        match response.status() {
            StatusCode::OK => {
                let body = response.json::<Value>().await.unwrap_or(Value::Null);
                let public_key = body.get("response").cloned().unwrap_or(body);
                self.registered.store(true, Ordering::Release);
                Ok(RegistrationStatus {
                    registered: true,
                    domain: domain.to_owned(),
                    public_key: Some(public_key),
                })
            }
            StatusCode::NOT_FOUND => Ok(RegistrationStatus {
                registered: false,
                domain: domain.to_owned(),
                public_key: None,
            }),
            status => {
                let body = response.text().await.unwrap_or_default();
                warn!(domain, status = status.as_u16(), body = %body, "Partner status lookup rejected");
                Err(OAuthError::RegistrationFailed(format!(
                    "HTTP {}",
                    status.as_u16()
                )))
            }
        }
    }

    /// Register at startup, logging instead of failing
    pub async fn register_on_startup(&self, domain: &str) {
        match self.register_domain(domain).await {
            Ok(RegistrationResult::Registered(_)) => {
                info!(domain, "Startup partner registration completed");
            }
            Ok(RegistrationResult::AlreadyRegistered) => {
                info!(domain, "Startup partner registration not needed");
            }
            Err(e) => {
                error!(domain, error = %e, "Startup partner registration failed, continuing");
            }
        }
    }

    async fn partner_token(&self) -> Result<String, OAuthError> {
        let raw = self
            .provider
            .client_credentials_token(PARTNER_SCOPES, &self.audience)
            .await
            .map_err(|e| OAuthError::RegistrationFailed(format!("partner token: {e}")))?;

        parse_token_response(&raw, self.clock.now())
            .map(|grant| grant.access_token)
            .map_err(|e| OAuthError::RegistrationFailed(format!("partner token: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_virtual_key_url() {
        assert_eq!(
            PartnerRegistrar::virtual_key_url("app.example.com"),
            "https://tesla.com/_ak/app.example.com"
        );
    }
}
