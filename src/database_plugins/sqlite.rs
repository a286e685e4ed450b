// ABOUTME: SQLite database implementation of the provider trait
// ABOUTME: Thin delegation layer over the Database struct that owns the SQL
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use super::DatabaseProvider;
use crate::config::DatabaseUrl;
use crate::database::Database;
use crate::errors::AppResult;
use crate::models::{NewTelemetryEvent, NewVehicle, TelemetryEvent, TokenRecord, User, Vehicle};

/// SQLite database implementation
#[derive(Clone)]
pub struct SqliteDatabase {
    /// The underlying database instance
    inner: Database,
}

impl SqliteDatabase {
    /// Open the database and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or migrated
    pub async fn new(database_url: &DatabaseUrl) -> AppResult<Self> {
        let inner = Database::new(database_url).await?;
        Ok(Self { inner })
    }

    /// Get a reference to the inner database
    #[must_use]
    pub const fn inner(&self) -> &Database {
        &self.inner
    }
}

#[async_trait]
impl DatabaseProvider for SqliteDatabase {
    fn backend_name(&self) -> &'static str {
        "sqlite"
    }

    async fn migrate(&self) -> AppResult<()> {
        self.inner.migrate().await
    }

    async fn ping(&self) -> AppResult<()> {
        self.inner.ping().await
    }

    async fn create_user(&self, user: &User) -> AppResult<Uuid> {
        self.inner.create_user(user).await
    }

    async fn get_user(&self, user_id: Uuid) -> AppResult<Option<User>> {
        self.inner.get_user(user_id).await
    }

    async fn get_user_by_email(&self, email: &str) -> AppResult<Option<User>> {
        self.inner.get_user_by_email(email).await
    }

    async fn get_user_by_external_id(&self, external_user_id: &str) -> AppResult<Option<User>> {
        self.inner.get_user_by_external_id(external_user_id).await
    }

    async fn update_last_login(&self, user_id: Uuid, at: DateTime<Utc>) -> AppResult<()> {
        self.inner.update_last_login(user_id, at).await
    }

    async fn upsert_token(&self, record: &TokenRecord) -> AppResult<TokenRecord> {
        self.inner.upsert_token(record).await
    }

    async fn get_token(&self, user_id: Uuid) -> AppResult<Option<TokenRecord>> {
        self.inner.get_token(user_id).await
    }

    async fn delete_token(&self, user_id: Uuid) -> AppResult<bool> {
        self.inner.delete_token(user_id).await
    }

    async fn upsert_vehicle(
        &self,
        vehicle: &NewVehicle,
        now: DateTime<Utc>,
    ) -> AppResult<Vehicle> {
        self.inner.upsert_vehicle(vehicle, now).await
    }

    async fn get_vehicles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Vehicle>> {
        self.inner.get_vehicles_for_user(user_id).await
    }

    async fn get_vehicle(&self, user_id: Uuid, vehicle_id: Uuid) -> AppResult<Option<Vehicle>> {
        self.inner.get_vehicle(user_id, vehicle_id).await
    }

    async fn update_vehicle_state(
        &self,
        vehicle_id: Uuid,
        state: &str,
        seen_at: DateTime<Utc>,
    ) -> AppResult<()> {
        self.inner
            .update_vehicle_state(vehicle_id, state, seen_at)
            .await
    }

    async fn insert_telemetry_event(&self, event: &NewTelemetryEvent) -> AppResult<Uuid> {
        self.inner.insert_telemetry_event(event).await
    }

    async fn get_recent_telemetry_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> AppResult<Vec<TelemetryEvent>> {
        self.inner
            .get_recent_telemetry_for_user(user_id, limit)
            .await
    }
}
