// ABOUTME: Vehicle database operations keyed by VIN
// ABOUTME: Syncs the provider vehicle list into per-user rows and tracks online state
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use chrono::{DateTime, Utc};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{parse_uuid, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{NewVehicle, Vehicle};

const VEHICLE_COLUMNS: &str = "id, user_id, provider_vehicle_id, vin, display_name, model, year, \
     color, state, battery_capacity_kwh, epa_range_km, last_seen_at, created_at, updated_at";

impl Database {
    /// Create vehicles table
    pub(super) async fn migrate_vehicles(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS vehicles (
                id TEXT PRIMARY KEY,
                user_id TEXT NOT NULL REFERENCES users(id) ON DELETE CASCADE,
                provider_vehicle_id INTEGER NOT NULL,
                vin TEXT UNIQUE NOT NULL,
                display_name TEXT,
                model TEXT,
                year INTEGER,
                color TEXT,
                state TEXT,
                battery_capacity_kwh REAL,
                epa_range_km REAL,
                last_seen_at TEXT,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_vehicles_user_id ON vehicles(user_id)")
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Insert a vehicle or update the row with the same VIN
    ///
    /// An existing row keeps its local id and creation time, so API paths stay stable
    /// across syncs.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn upsert_vehicle(
        &self,
        vehicle: &NewVehicle,
        now: DateTime<Utc>,
    ) -> AppResult<Vehicle> {
        sqlx::query(
            r"
            INSERT INTO vehicles (
                id, user_id, provider_vehicle_id, vin, display_name, model, year, color,
                state, battery_capacity_kwh, epa_range_km, last_seen_at, created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $12, $12)
            ON CONFLICT (vin)
            DO UPDATE SET
                user_id = excluded.user_id,
                provider_vehicle_id = excluded.provider_vehicle_id,
                display_name = excluded.display_name,
                model = COALESCE(excluded.model, vehicles.model),
                year = COALESCE(excluded.year, vehicles.year),
                color = COALESCE(excluded.color, vehicles.color),
                state = excluded.state,
                battery_capacity_kwh = COALESCE(excluded.battery_capacity_kwh, vehicles.battery_capacity_kwh),
                epa_range_km = COALESCE(excluded.epa_range_km, vehicles.epa_range_km),
                last_seen_at = excluded.last_seen_at,
                updated_at = excluded.updated_at
            ",
        )
        .bind(Uuid::new_v4().to_string())
        .bind(vehicle.user_id.to_string())
        .bind(vehicle.provider_vehicle_id)
        .bind(&vehicle.vin)
        .bind(vehicle.display_name.as_deref())
        .bind(vehicle.model.as_deref())
        .bind(vehicle.year)
        .bind(vehicle.color.as_deref())
        .bind(vehicle.state.as_deref())
        .bind(vehicle.battery_capacity_kwh)
        .bind(vehicle.epa_range_km)
        .bind(now)
        .execute(&self.pool)
        .await?;

        let row = sqlx::query(&format!("SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE vin = $1"))
            .bind(&vehicle.vin)
            .fetch_one(&self.pool)
            .await?;
        Self::row_to_vehicle(&row)
    }

    /// List the vehicles of a user, ordered by name then VIN
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a row is malformed
    pub async fn get_vehicles_for_user(&self, user_id: Uuid) -> AppResult<Vec<Vehicle>> {
        let rows = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE user_id = $1 ORDER BY display_name, vin"
        ))
        .bind(user_id.to_string())
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_vehicle).collect()
    }

    /// Get one vehicle of a user by local id
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed
    pub async fn get_vehicle(&self, user_id: Uuid, vehicle_id: Uuid) -> AppResult<Option<Vehicle>> {
        let row = sqlx::query(&format!(
            "SELECT {VEHICLE_COLUMNS} FROM vehicles WHERE id = $1 AND user_id = $2"
        ))
        .bind(vehicle_id.to_string())
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_vehicle).transpose()
    }

    /// Record the latest provider state of a vehicle
    ///
    /// # Errors
    ///
    /// Returns an error if the vehicle does not exist or the update fails
    pub async fn update_vehicle_state(
        &self,
        vehicle_id: Uuid,
        state: &str,
        seen_at: DateTime<Utc>,
    ) -> AppResult<()> {
        let result = sqlx::query(
            "UPDATE vehicles SET state = $1, last_seen_at = $2, updated_at = $2 WHERE id = $3",
        )
        .bind(state)
        .bind(seen_at)
        .bind(vehicle_id.to_string())
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::not_found(format!("Vehicle {vehicle_id}")));
        }
        Ok(())
    }

    fn row_to_vehicle(row: &SqliteRow) -> AppResult<Vehicle> {
        let id: String = row.try_get("id")?;
        let user_id: String = row.try_get("user_id")?;
        Ok(Vehicle {
            id: parse_uuid(&id)?,
            user_id: parse_uuid(&user_id)?,
            provider_vehicle_id: row.try_get("provider_vehicle_id")?,
            vin: row.try_get("vin")?,
            display_name: row.try_get("display_name")?,
            model: row.try_get("model")?,
            year: row.try_get("year")?,
            color: row.try_get("color")?,
            state: row.try_get("state")?,
            battery_capacity_kwh: row.try_get("battery_capacity_kwh")?,
            epa_range_km: row.try_get("epa_range_km")?,
            last_seen_at: row.try_get("last_seen_at")?,
            created_at: row.try_get("created_at")?,
            updated_at: row.try_get("updated_at")?,
        })
    }
}
