// ABOUTME: Append-only telemetry event model
// ABOUTME: Events carry the raw JSON payload received by the ingest endpoint
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Stored telemetry event
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct TelemetryEvent {
    /// Event identifier
    pub id: Uuid,
    /// Vehicle the event belongs to, when the payload names one
    pub vin: Option<String>,
    /// Producer of the event (`ingest` unless the payload says otherwise)
    pub source: String,
    /// Payload as received, stamped with `_received_at`
    pub payload: Value,
    /// Arrival time
    pub received_at: DateTime<Utc>,
}

/// Telemetry event to append
#[derive(Debug, Clone, PartialEq)]
pub struct NewTelemetryEvent {
    /// Vehicle the event belongs to
    pub vin: Option<String>,
    /// Producer of the event
    pub source: String,
    /// Payload to store
    pub payload: Value,
    /// Arrival time
    pub received_at: DateTime<Utc>,
}
