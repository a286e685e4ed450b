// ABOUTME: Append-only telemetry event storage
// ABOUTME: Recent events are read back only for VINs the requesting user owns
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{parse_uuid, Database};
use crate::errors::{AppError, AppResult};
use crate::models::{NewTelemetryEvent, TelemetryEvent};

impl Database {
    /// Create `telemetry_events` table
    pub(super) async fn migrate_telemetry(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS telemetry_events (
                id TEXT PRIMARY KEY,
                vin TEXT,
                source TEXT NOT NULL,
                payload TEXT NOT NULL,
                received_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        sqlx::query(
            "CREATE INDEX IF NOT EXISTS idx_telemetry_vin_received ON telemetry_events(vin, received_at)",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Append a telemetry event
    ///
    /// # Errors
    ///
    /// Returns an error if the payload cannot be serialized or the insert fails
    pub async fn insert_telemetry_event(&self, event: &NewTelemetryEvent) -> AppResult<Uuid> {
        let id = Uuid::new_v4();
        let payload = serde_json::to_string(&event.payload)?;

        sqlx::query(
            r"
            INSERT INTO telemetry_events (id, vin, source, payload, received_at)
            VALUES ($1, $2, $3, $4, $5)
            ",
        )
        .bind(id.to_string())
        .bind(event.vin.as_deref())
        .bind(&event.source)
        .bind(payload)
        .bind(event.received_at)
        .execute(&self.pool)
        .await?;

        Ok(id)
    }

    /// Most recent events for the vehicles of a user, newest first
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or a stored payload is not JSON
    pub async fn get_recent_telemetry_for_user(
        &self,
        user_id: Uuid,
        limit: u32,
    ) -> AppResult<Vec<TelemetryEvent>> {
        let rows = sqlx::query(
            r"
            SELECT t.id, t.vin, t.source, t.payload, t.received_at
            FROM telemetry_events t
            JOIN vehicles v ON v.vin = t.vin
            WHERE v.user_id = $1
            ORDER BY t.received_at DESC
            LIMIT $2
            ",
        )
        .bind(user_id.to_string())
        .bind(i64::from(limit))
        .fetch_all(&self.pool)
        .await?;

        rows.iter().map(Self::row_to_event).collect()
    }

    fn row_to_event(row: &SqliteRow) -> AppResult<TelemetryEvent> {
        let id: String = row.try_get("id")?;
        let payload: String = row.try_get("payload")?;
        Ok(TelemetryEvent {
            id: parse_uuid(&id)?,
            vin: row.try_get("vin")?,
            source: row.try_get("source")?,
            payload: serde_json::from_str(&payload).map_err(|e| {
                AppError::database(format!("Stored telemetry payload {id} is not JSON: {e}"))
            })?,
            received_at: row.try_get("received_at")?,
        })
    }
}
