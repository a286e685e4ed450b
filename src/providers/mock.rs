// ABOUTME: Mock vehicle data provider returning a fixed sample Model 3
// ABOUTME: Used in development until the partner account can reach the real Fleet API
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use chrono::Utc;
use serde_json::{json, Value};
use tracing::debug;

use super::{ProviderError, ProviderVehicle, VehicleConfig, VehicleDataProvider};
use crate::constants::tesla::VEHICLE_STATE_ONLINE;

/// Always-awake sample vehicle
#[derive(Debug, Clone)]
pub struct MockVehicleProvider {
    vehicle: ProviderVehicle,
}

impl MockVehicleProvider {
    /// Provider id of the sample vehicle
    pub const VEHICLE_ID: i64 = 123_456_789;
    /// VIN of the sample vehicle
    pub const VIN: &'static str = "5YJ3E1EA1KF123456";

    /// Create the mock provider
    #[must_use]
    pub fn new() -> Self {
        Self {
            vehicle: ProviderVehicle {
                id: Self::VEHICLE_ID,
                vehicle_id: Some(987_654_321),
                vin: Self::VIN.to_owned(),
                display_name: Some("My Tesla".to_owned()),
                state: Some(VEHICLE_STATE_ONLINE.to_owned()),
                vehicle_config: Some(VehicleConfig {
                    car_type: Some("Model 3".to_owned()),
                    exterior_color: Some("MidnightSilverMetallic".to_owned()),
                    trim_badging: Some("Long Range".to_owned()),
                    year: Some(2023),
                }),
            },
        }
    }

    fn sample_vehicle_data() -> Value {
        let now = Utc::now();
        json!({
            "drive_state": {
                "speed": null,
                "shift_state": "P",
                "heading": 0,
                "latitude": 37.7749,
                "longitude": -122.4194,
                "gps_as_of": now.timestamp()
            },
            "charge_state": {
                "battery_level": 74,
                "battery_range": 245.6,
                "est_battery_range": 240.2,
                "ideal_battery_range": 250.8,
                "usable_battery_level": 73,
                "charge_energy_added": 15.5,
                "charger_power": 0,
                "charging_state": "Disconnected"
            },
            "climate_state": {
                "inside_temp": 20.5,
                "outside_temp": 18.2,
                "is_climate_on": false,
                "driver_temp_setting": 21.0,
                "passenger_temp_setting": 21.0
            },
            "vehicle_state": {
                "odometer": 12456.8,
                "software_version": "2024.14.9",
                "car_version": "2024.14.9 abcdef123456",
                "timestamp": now.timestamp_millis()
            },
            "state": VEHICLE_STATE_ONLINE
        })
    }
}

impl Default for MockVehicleProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl VehicleDataProvider for MockVehicleProvider {
    fn name(&self) -> &'static str {
        "mock"
    }

    async fn list_vehicles(&self, _access_token: &str) -> Result<Vec<ProviderVehicle>, ProviderError> {
        debug!("MOCK: returning sample vehicle list");
        Ok(vec![self.vehicle.clone()])
    }

    async fn get_vehicle(
        &self,
        _access_token: &str,
        vehicle_id: i64,
    ) -> Result<ProviderVehicle, ProviderError> {
        if vehicle_id != self.vehicle.id {
            return Err(ProviderError::NotFound(vehicle_id.to_string()));
        }
        Ok(self.vehicle.clone())
    }

    async fn vehicle_data(
        &self,
        _access_token: &str,
        vehicle_id: i64,
    ) -> Result<Value, ProviderError> {
        if vehicle_id != self.vehicle.id {
            return Err(ProviderError::NotFound(vehicle_id.to_string()));
        }
        debug!("MOCK: returning sample vehicle data");
        Ok(Self::sample_vehicle_data())
    }

    async fn wake_up(
        &self,
        _access_token: &str,
        vehicle_id: i64,
    ) -> Result<ProviderVehicle, ProviderError> {
        debug!("MOCK: simulated wake up");
        self.get_vehicle("", vehicle_id).await
    }
}
