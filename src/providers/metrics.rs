// ABOUTME: Driving metrics extracted from raw vehicle data and the derived report served to the app
// ABOUTME: Converts imperial provider units and estimates consumption and efficiency figures
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::constants::units::{MILES_TO_KM, MPH_TO_KMH};

/// Consumption baseline at city speeds, in Wh/km
const BASE_CONSUMPTION_WH_PER_KM: f64 = 150.0;
/// Assumed average consumption, in Wh/km
const AVERAGE_CONSUMPTION_WH_PER_KM: i64 = 180;
/// Efficiency reported when the battery level is unknown
const FALLBACK_LIVE_EFFICIENCY: f64 = 70.0;
/// Average efficiency reported when the battery level is unknown
const FALLBACK_AVERAGE_EFFICIENCY: i64 = 81;
/// Distance reported when the odometer is unknown, in km
const FALLBACK_DISTANCE_KM: i64 = 100;

/// Flattened view of a `vehicle_data` response, in provider units
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct VehicleMetrics {
    /// Speed in mph (0 when parked)
    pub speed: f64,
    /// Odometer in miles
    pub odometer: f64,
    /// Battery level, percent
    pub battery_level: f64,
    /// Rated range, miles
    pub battery_range: f64,
    /// Estimated range, miles
    pub est_battery_range: f64,
    /// Ideal range, miles
    pub ideal_battery_range: f64,
    /// Usable battery level, percent
    pub usable_battery_level: f64,
    /// Charger power, kW
    pub charger_power: f64,
    /// Energy added by the last charge, kWh
    pub charge_energy_added: f64,
    /// Gear (`P`, `D`, `R`, `N`)
    pub shift_state: String,
    /// Heading, degrees
    pub heading: f64,
    /// GPS fix time, seconds since epoch
    pub gps_as_of: Option<f64>,
    /// Latitude
    pub latitude: Option<f64>,
    /// Longitude
    pub longitude: Option<f64>,
    /// Cabin temperature, Celsius
    pub inside_temp: Option<f64>,
    /// Outside temperature, Celsius
    pub outside_temp: Option<f64>,
    /// Whether climate control runs
    pub is_climate_on: bool,
    /// Sample time
    pub timestamp: DateTime<Utc>,
}

impl VehicleMetrics {
    /// Extract metrics from a raw `vehicle_data` payload
    ///
    /// Missing sections and fields read as zero (or `None`); the sample time falls
    /// back to `now` when the vehicle state carries no millisecond timestamp.
    #[must_use]
    pub fn from_vehicle_data(data: &Value, now: DateTime<Utc>) -> Self {
        let drive = &data["drive_state"];
        let charge = &data["charge_state"];
        let climate = &data["climate_state"];
        let vehicle = &data["vehicle_state"];

        let timestamp = vehicle["timestamp"]
            .as_i64()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or(now);

        Self {
            speed: number(&drive["speed"]),
            odometer: number(&vehicle["odometer"]),
            battery_level: number(&charge["battery_level"]),
            battery_range: number(&charge["battery_range"]),
            est_battery_range: number(&charge["est_battery_range"]),
            ideal_battery_range: number(&charge["ideal_battery_range"]),
            usable_battery_level: number(&charge["usable_battery_level"]),
            charger_power: number(&charge["charger_power"]),
            charge_energy_added: number(&charge["charge_energy_added"]),
            shift_state: drive["shift_state"]
                .as_str()
                .filter(|s| !s.is_empty())
                .unwrap_or("P")
                .to_owned(),
            heading: number(&drive["heading"]),
            gps_as_of: drive["gps_as_of"].as_f64(),
            latitude: drive["latitude"].as_f64(),
            longitude: drive["longitude"].as_f64(),
            inside_temp: climate["inside_temp"].as_f64(),
            outside_temp: climate["outside_temp"].as_f64(),
            is_climate_on: climate["is_climate_on"].as_bool().unwrap_or(false),
            timestamp,
        }
    }
}

fn number(value: &Value) -> f64 {
    value.as_f64().unwrap_or(0.0)
}

/// Reporting window requested by the app
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum MetricsPeriod {
    /// Current trip
    #[default]
    Trip,
    /// Since last charge
    Charge,
    /// Lifetime
    AllTime,
}

/// Current driving snapshot
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CurrentSnapshot {
    /// Speed, km/h rounded
    pub speed: i64,
    /// Always `kmh`
    pub speed_unit: &'static str,
    /// Battery level, percent
    pub battery_level: f64,
    /// Gear
    pub shift_state: String,
    /// Sample time
    pub timestamp: DateTime<Utc>,
}

/// Instantaneous consumption estimate
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct LiveConsumption {
    /// Wh/km
    pub rate: i64,
    /// Percent, capped at 100
    pub efficiency: f64,
}

/// Long-run efficiency
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct AverageEfficiency {
    /// Percent
    pub efficiency: i64,
    /// Distance driven, km
    pub distance: i64,
}

/// Energy figures
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct EnergyUsage {
    /// kWh
    pub total: f64,
    /// Wh/km
    pub avg_consumption: i64,
}

/// Raw inputs echoed for troubleshooting
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsDebug {
    /// Battery level as reported
    pub raw_battery_level: f64,
    /// Speed as reported (mph)
    pub raw_speed: f64,
    /// Odometer as reported (miles)
    pub raw_odometer: f64,
    /// Charge energy as reported (kWh)
    pub raw_charge_energy: f64,
}

/// Metrics report returned by the metrics endpoint
#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct MetricsReport {
    /// Current snapshot
    pub current: CurrentSnapshot,
    /// Live consumption estimate
    pub live_consumption: LiveConsumption,
    /// Average efficiency
    pub average_efficiency: AverageEfficiency,
    /// Energy usage
    pub energy_usage: EnergyUsage,
    /// Requested period
    pub period: MetricsPeriod,
    /// Raw inputs
    pub debug: MetricsDebug,
}

impl MetricsReport {
    /// Build the report for `metrics` over `period`
    #[must_use]
    pub fn build(metrics: &VehicleMetrics, period: MetricsPeriod) -> Self {
        let battery = metrics.battery_level;
        let odometer = metrics.odometer;
        let has_battery = battery > 0.0;

        Self {
            current: CurrentSnapshot {
                speed: (metrics.speed * MPH_TO_KMH).round() as i64,
                speed_unit: "kmh",
                battery_level: battery,
                shift_state: metrics.shift_state.clone(),
                timestamp: metrics.timestamp,
            },
            live_consumption: LiveConsumption {
                rate: instant_consumption(metrics.speed),
                efficiency: if has_battery {
                    (battery * 1.2).min(100.0)
                } else {
                    FALLBACK_LIVE_EFFICIENCY
                },
            },
            average_efficiency: AverageEfficiency {
                efficiency: if has_battery {
                    (battery * 1.1).round() as i64
                } else {
                    FALLBACK_AVERAGE_EFFICIENCY
                },
                distance: if odometer > 0.0 {
                    (odometer * MILES_TO_KM).round() as i64
                } else {
                    FALLBACK_DISTANCE_KM
                },
            },
            energy_usage: EnergyUsage {
                total: if metrics.charge_energy_added > 0.0 {
                    metrics.charge_energy_added
                } else {
                    battery * 0.75 * 0.25
                },
                avg_consumption: AVERAGE_CONSUMPTION_WH_PER_KM,
            },
            period,
            debug: MetricsDebug {
                raw_battery_level: battery,
                raw_speed: metrics.speed,
                raw_odometer: odometer,
                raw_charge_energy: metrics.charge_energy_added,
            },
        }
    }
}

/// Consumption estimate in Wh/km from the speed in mph
fn instant_consumption(speed_mph: f64) -> i64 {
    if speed_mph <= 0.0 {
        return 0;
    }
    (BASE_CONSUMPTION_WH_PER_KM * (speed_mph / 100.0).max(1.0)).round() as i64
}
