// ABOUTME: Vehicle model synchronized from the provider vehicle list
// ABOUTME: Vehicles are upserted by VIN and their online state tracked after data and wake calls
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Vehicle owned by an app user
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Vehicle {
    /// Local identifier used in API paths
    pub id: Uuid,
    /// Owning user
    pub user_id: Uuid,
    /// Provider vehicle id used in Fleet API paths
    pub provider_vehicle_id: i64,
    /// Vehicle identification number (unique)
    pub vin: String,
    /// Owner-chosen name
    pub display_name: Option<String>,
    /// Model (car type or trim)
    pub model: Option<String>,
    /// Model year
    pub year: Option<i32>,
    /// Exterior color
    pub color: Option<String>,
    /// Last known state (`online`, `asleep`, `offline`)
    pub state: Option<String>,
    /// Battery capacity, when known
    pub battery_capacity_kwh: Option<f64>,
    /// EPA range, when known
    pub epa_range_km: Option<f64>,
    /// Last time the vehicle was seen by the provider
    pub last_seen_at: Option<DateTime<Utc>>,
    /// First sync
    pub created_at: DateTime<Utc>,
    /// Last sync
    pub updated_at: DateTime<Utc>,
}

/// Vehicle fields written by an upsert
#[derive(Debug, Clone, PartialEq)]
pub struct NewVehicle {
    /// Owning user
    pub user_id: Uuid,
    /// Provider vehicle id
    pub provider_vehicle_id: i64,
    /// Vehicle identification number
    pub vin: String,
    /// Owner-chosen name
    pub display_name: Option<String>,
    /// Model (car type or trim)
    pub model: Option<String>,
    /// Model year
    pub year: Option<i32>,
    /// Exterior color
    pub color: Option<String>,
    /// Current state
    pub state: Option<String>,
    /// Battery capacity, when known
    pub battery_capacity_kwh: Option<f64>,
    /// EPA range, when known
    pub epa_range_km: Option<f64>,
}
