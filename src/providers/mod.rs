// ABOUTME: Vehicle data providers consuming access tokens from the token lifecycle manager
// ABOUTME: Defines the VehicleDataProvider trait with mock and Fleet API implementations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Vehicle Data Providers
//!
//! Providers never manage tokens: every call receives an access token that the
//! caller obtained from the token lifecycle manager.

/// Structured provider errors
pub mod errors;
/// Real Fleet API client
pub mod fleet_api;
/// Driving metrics report
pub mod metrics;
/// Fixed sample data for development
pub mod mock;

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::info;
use uuid::Uuid;

use crate::config::TeslaConfig;
use crate::constants::tesla::VEHICLE_STATE_ONLINE;
use crate::models::NewVehicle;

pub use errors::ProviderError;
pub use fleet_api::FleetApiProvider;
pub use metrics::{MetricsPeriod, MetricsReport, VehicleMetrics};
pub use mock::MockVehicleProvider;

/// Vehicle configuration block of a provider vehicle
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct VehicleConfig {
    /// Car type (e.g. `Model 3`)
    #[serde(default)]
    pub car_type: Option<String>,
    /// Paint
    #[serde(default)]
    pub exterior_color: Option<String>,
    /// Trim badge
    #[serde(default)]
    pub trim_badging: Option<String>,
    /// Model year
    #[serde(default)]
    pub year: Option<i32>,
}

/// Vehicle as listed by the provider
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProviderVehicle {
    /// Provider id used in API paths
    pub id: i64,
    /// Secondary provider id
    #[serde(default)]
    pub vehicle_id: Option<i64>,
    /// VIN
    pub vin: String,
    /// Owner-chosen name
    #[serde(default)]
    pub display_name: Option<String>,
    /// `online`, `asleep` or `offline`
    #[serde(default)]
    pub state: Option<String>,
    /// Configuration block, when the provider includes it
    #[serde(default)]
    pub vehicle_config: Option<VehicleConfig>,
}

impl ProviderVehicle {
    /// Whether the vehicle can answer data requests right away
    #[must_use]
    pub fn is_awake(&self) -> bool {
        self.state.as_deref() == Some(VEHICLE_STATE_ONLINE)
    }

    /// Row written when syncing this vehicle for `user_id`
    #[must_use]
    pub fn to_new_vehicle(&self, user_id: Uuid) -> NewVehicle {
        let config = self.vehicle_config.clone().unwrap_or_default();
        NewVehicle {
            user_id,
            provider_vehicle_id: self.id,
            vin: self.vin.clone(),
            display_name: self.display_name.clone(),
            model: config.car_type.or(config.trim_badging),
            year: config.year,
            color: config.exterior_color,
            state: self.state.clone(),
            battery_capacity_kwh: None,
            epa_range_km: None,
        }
    }
}

/// Source of vehicle data
#[async_trait]
pub trait VehicleDataProvider: Send + Sync {
    /// Provider name used in logs and errors
    fn name(&self) -> &'static str;

    /// List the vehicles visible to the token's owner
    async fn list_vehicles(&self, access_token: &str) -> Result<Vec<ProviderVehicle>, ProviderError>;

    /// Get one vehicle (includes its online state)
    async fn get_vehicle(
        &self,
        access_token: &str,
        vehicle_id: i64,
    ) -> Result<ProviderVehicle, ProviderError>;

    /// Get the full `vehicle_data` payload
    async fn vehicle_data(&self, access_token: &str, vehicle_id: i64)
        -> Result<Value, ProviderError>;

    /// Send a wake-up and return the vehicle as reported afterwards
    async fn wake_up(
        &self,
        access_token: &str,
        vehicle_id: i64,
    ) -> Result<ProviderVehicle, ProviderError>;

    /// Extract driving metrics from a `vehicle_data` payload
    fn parse_metrics(&self, data: &Value, now: DateTime<Utc>) -> VehicleMetrics {
        VehicleMetrics::from_vehicle_data(data, now)
    }
}

/// Create the provider selected by configuration
#[must_use]
pub fn create_vehicle_provider(
    config: &TeslaConfig,
    timeout_secs: u64,
) -> Arc<dyn VehicleDataProvider> {
    if config.use_mock {
        info!("MOCK MODE: serving sample vehicle data (set USE_MOCK_TESLA=false for the real API)");
        Arc::new(MockVehicleProvider::new())
    } else {
        info!(api_base_url = %config.api_base_url, "Using Fleet API vehicle provider");
        Arc::new(FleetApiProvider::new(&config.api_base_url, timeout_secs))
    }
}
