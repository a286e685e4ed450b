// ABOUTME: Fleet API vehicle data provider over reqwest
// ABOUTME: Unwraps the {"response": ...} envelope and classifies auth, sleep and transport failures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, warn};

use super::{ProviderError, ProviderVehicle, VehicleDataProvider};
use crate::constants::tesla::VEHICLES_PATH;
use crate::utils::http_client::{api_client, authorized_request};

const PROVIDER_NAME: &str = "fleet-api";

/// Real Fleet API client
#[derive(Clone)]
pub struct FleetApiProvider {
    client: Client,
    api_base_url: String,
}

impl FleetApiProvider {
    /// Create a provider for `api_base_url`
    #[must_use]
    pub fn new(api_base_url: &str, timeout_secs: u64) -> Self {
        Self::with_http_client(api_base_url, api_client(timeout_secs))
    }

    /// Create a provider with a caller-supplied HTTP client
    #[must_use]
    pub fn with_http_client(api_base_url: &str, client: Client) -> Self {
        Self {
            client,
            api_base_url: api_base_url.trim_end_matches('/').to_owned(),
        }
    }

    async fn call<T: DeserializeOwned>(
        &self,
        method: Method,
        path: &str,
        access_token: &str,
    ) -> Result<T, ProviderError> {
        let url = format!("{}{path}", self.api_base_url);
        debug!(%method, path, "Fleet API request");

        let response = authorized_request(&self.client, method, &url, access_token)
            .send()
            .await
            .map_err(|e| ProviderError::Transport {
                provider: PROVIDER_NAME,
                message: e.to_string(),
                timed_out: e.is_timeout(),
            })?;

        let status = response.status();
        let body: Value = response.json().await.unwrap_or(Value::Null);

        if !status.is_success() {
            return Err(Self::classify_failure(status, path, &body));
        }

        let payload = body.get("response").cloned().unwrap_or(Value::Null);
        serde_json::from_value(payload).map_err(|e| ProviderError::InvalidResponse {
            provider: PROVIDER_NAME,
            details: format!("{path}: {e}"),
        })
    }

    fn classify_failure(status: StatusCode, path: &str, body: &Value) -> ProviderError {
        let message = body
            .get("error")
            .or_else(|| body.get("message"))
            .and_then(Value::as_str)
            .unwrap_or("")
            .to_owned();
        warn!(status = status.as_u16(), path, body = %body, "Fleet API request failed");

        let auth_rejected = matches!(status, StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN)
            || message == "invalid bearer token";
        if auth_rejected {
            return ProviderError::AuthFailed {
                provider: PROVIDER_NAME,
                status: status.as_u16(),
            };
        }

        match status {
            StatusCode::REQUEST_TIMEOUT => ProviderError::VehicleAsleep,
            StatusCode::NOT_FOUND => ProviderError::NotFound(path.to_owned()),
            _ => ProviderError::ApiError {
                provider: PROVIDER_NAME,
                status: status.as_u16(),
                message,
            },
        }
    }
}

#[async_trait]
impl VehicleDataProvider for FleetApiProvider {
    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn list_vehicles(&self, access_token: &str) -> Result<Vec<ProviderVehicle>, ProviderError> {
        let vehicles: Option<Vec<ProviderVehicle>> =
            self.call(Method::GET, VEHICLES_PATH, access_token).await?;
        let vehicles = vehicles.unwrap_or_default();
        debug!(count = vehicles.len(), "Fleet API vehicle list");
        Ok(vehicles)
    }

    async fn get_vehicle(
        &self,
        access_token: &str,
        vehicle_id: i64,
    ) -> Result<ProviderVehicle, ProviderError> {
        self.call(
            Method::GET,
            &format!("{VEHICLES_PATH}/{vehicle_id}"),
            access_token,
        )
        .await
    }

    async fn vehicle_data(
        &self,
        access_token: &str,
        vehicle_id: i64,
    ) -> Result<Value, ProviderError> {
        self.call(
            Method::GET,
            &format!("{VEHICLES_PATH}/{vehicle_id}/vehicle_data"),
            access_token,
        )
        .await
        .map_err(|e| match e {
            // A vehicle that does not answer within the timeout is almost always asleep
            ProviderError::Transport {
                timed_out: true, ..
            } => ProviderError::VehicleAsleep,
            other => other,
        })
    }

    async fn wake_up(
        &self,
        access_token: &str,
        vehicle_id: i64,
    ) -> Result<ProviderVehicle, ProviderError> {
        self.call(
            Method::POST,
            &format!("{VEHICLES_PATH}/{vehicle_id}/wake_up"),
            access_token,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_failure_classification() {
        let path = "/api/1/vehicles/1/vehicle_data";
        assert!(matches!(
            FleetApiProvider::classify_failure(StatusCode::FORBIDDEN, path, &Value::Null),
            ProviderError::AuthFailed { status: 403, .. }
        ));
        assert!(matches!(
            FleetApiProvider::classify_failure(StatusCode::REQUEST_TIMEOUT, path, &Value::Null),
            ProviderError::VehicleAsleep
        ));
        assert!(matches!(
            FleetApiProvider::classify_failure(
                StatusCode::BAD_REQUEST,
                path,
                &json!({"error": "invalid bearer token"})
            ),
            ProviderError::AuthFailed { status: 400, .. }
        ));
        assert!(matches!(
            FleetApiProvider::classify_failure(
                StatusCode::INTERNAL_SERVER_ERROR,
                path,
                &json!({"message": "upstream"})
            ),
            ProviderError::ApiError { status: 500, ref message, .. } if message == "upstream"
        ));
    }
}
