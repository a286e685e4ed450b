// ABOUTME: Database abstraction layer for the fleet auth broker
// ABOUTME: Object-safe provider trait so services hold an Arc<dyn DatabaseProvider>
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::errors::AppResult;
use crate::models::{NewTelemetryEvent, NewVehicle, TelemetryEvent, TokenRecord, User, Vehicle};

pub mod sqlite;

pub use sqlite::SqliteDatabase;

/// Core database abstraction trait
///
/// All persistence used by the token lifecycle manager and the HTTP routes goes
/// through this trait, so tests can swap in a fresh in-memory database per case.
#[async_trait]
pub trait DatabaseProvider: Send + Sync {
    /// Human-readable backend name for health reports
    fn backend_name(&self) -> &'static str;

    /// Run database migrations to set up schema
    async fn migrate(&self) -> AppResult<()>;

    /// Check connectivity
    async fn ping(&self) -> AppResult<()>;

    // ================================
    // User Management
    // ================================

    /// Create a new user account
    async fn create_user(&self, user: &User) -> AppResult<Uuid>;

    /// Get user by ID
    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>>;

    /// Get user by email address
    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>>;

    /// Get user by provider subject
    async fn get_user_by_external_id(&self, external_user_id: &str) -> AppResult<Option<User>>;

    /// Record a successful login
    async fn update_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()>;

    // ================================
    // Provider Token Management
    // ================================

    /// Insert or update the token row of a user, keeping the stored refresh token
    /// when the record carries none
    async fn upsert_token(&self, record: &TokenRecord) -> AppResult<TokenRecord>;

    /// Get the token row of a user
    async fn get_token(&self, user_id: Uuid) -> AppResult<Option<TokenRecord>>;

    /// Delete the token row of a user; returns whether a row existed
    async fn delete_token(&self, user_id: Uuid) -> AppResult<bool>;

    // ================================
    // Vehicles
    // ================================

    /// Insert or update a vehicle by VIN
    async fn upsert_vehicle(&self, vehicle: &NewVehicle, now: DateTime<Utc>)
        -> AppResult<Vehicle>;

    /// List the vehicles of a user
    async fn get_vehicles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Vehicle>>;

    /// Get a vehicle owned by a user
    async fn get_vehicle(&self, user_id: Uuid, vehicle_id: Uuid) -> AppResult<Option<Vehicle>>;

    /// Record the latest provider state of a vehicle
    async fn update_vehicle_state(
        &self,
        vehicle_id: Uuid,
        state: &str,
        seen_at: DateTime<Utc>,
    ) -> AppResult<()>;

    // ================================
    // Telemetry
    // ================================

    /// Append a telemetry event
    async fn insert_telemetry_event(&self, event: &NewTelemetryEvent) -> AppResult<Uuid>;

    /// Most recent events for the vehicles of a user
    async fn get_recent_telemetry_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> AppResult<Vec<TelemetryEvent>>;
}
