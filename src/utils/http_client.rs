// ABOUTME: Shared HTTP client utilities with connection pooling and timeout configuration
// ABOUTME: Provides provider-tuned clients and the stateless bearer request signer
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use crate::constants::network::{PROVIDER_CONNECT_TIMEOUT_SECS, PROVIDER_TIMEOUT_SECS};
use reqwest::{header, Client, ClientBuilder, Method, RequestBuilder};
use std::time::Duration;

/// Create a new HTTP client with custom timeout settings
///
/// Falls back to a default client if the builder fails (TLS backend init).
#[must_use]
pub fn create_client_with_timeout(timeout_secs: u64, connect_timeout_secs: u64) -> Client {
    ClientBuilder::new()
        .timeout(Duration::from_secs(timeout_secs))
        .connect_timeout(Duration::from_secs(connect_timeout_secs))
        .user_agent(concat!("fleet-auth-broker/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Create a new HTTP client for `OAuth` token, revoke and registration calls
///
/// Provider calls must never hang a request: a timed-out call surfaces as a
/// retryable failure.
#[must_use]
pub fn oauth_client() -> Client {
    create_client_with_timeout(PROVIDER_TIMEOUT_SECS, PROVIDER_CONNECT_TIMEOUT_SECS)
}

/// Create a new HTTP client for vehicle data calls
#[must_use]
pub fn api_client(timeout_secs: u64) -> Client {
    create_client_with_timeout(timeout_secs, PROVIDER_CONNECT_TIMEOUT_SECS)
}

/// Sign a request with a provider access token
///
/// Stateless: the caller obtains the token (normally from
/// `TokenLifecycleManager::get_valid_access_token`) and this function only attaches
/// it. The per-request timeout overrides the client default.
pub fn authorized_request(
    client: &Client,
    method: Method,
    url: &str,
    access_token: &str,
) -> RequestBuilder {
    client
        .request(method, url)
        .bearer_auth(access_token)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::ACCEPT, "application/json")
        .timeout(Duration::from_secs(PROVIDER_TIMEOUT_SECS))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_authorized_request_sets_bearer_header() {
        let client = oauth_client();
        let request = authorized_request(
            &client,
            Method::GET,
            "https://fleet-api.example.com/api/1/vehicles",
            "access-123",
        )
        .build()
        .unwrap();

        assert_eq!(request.method(), Method::GET);
        assert_eq!(
            request.headers().get(header::AUTHORIZATION).unwrap(),
            "Bearer access-123"
        );
        assert_eq!(
            request.headers().get(header::CONTENT_TYPE).unwrap(),
            "application/json"
        );
        assert_eq!(
            request.timeout(),
            Some(&Duration::from_secs(PROVIDER_TIMEOUT_SECS))
        );
    }
}
