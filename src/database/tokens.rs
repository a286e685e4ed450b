// ABOUTME: Provider token database operations, one row per user
// ABOUTME: Upserts keep the stored refresh token when a grant carries none
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use sqlx::sqlite::SqliteRow;
use sqlx::Row;
use uuid::Uuid;

use super::{parse_uuid, Database};
use crate::errors::{AppError, AppResult};
use crate::models::TokenRecord;

impl Database {
    /// Create `tesla_tokens` table
    pub(super) async fn migrate_tokens(&self) -> AppResult<()> {
        sqlx::query(
            r"
            CREATE TABLE IF NOT EXISTS tesla_tokens (
                user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
                access_token TEXT NOT NULL,
                refresh_token TEXT,
                token_type TEXT NOT NULL DEFAULT 'Bearer',
                expires_at TEXT NOT NULL,
                scopes TEXT NOT NULL DEFAULT '',
                updated_at TEXT NOT NULL
            )
            ",
        )
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Insert or replace the token row of a user and return the stored row
    ///
    /// The access token, type, expiry, scopes and update time are always replaced. The
    /// refresh token is replaced only when the record carries one.
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn upsert_token(&self, record: &TokenRecord) -> AppResult<TokenRecord> {
        sqlx::query(
            r"
            INSERT INTO tesla_tokens (
                user_id, access_token, refresh_token, token_type, expires_at, scopes, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id)
            DO UPDATE SET
                access_token = excluded.access_token,
                refresh_token = COALESCE(excluded.refresh_token, tesla_tokens.refresh_token),
                token_type = excluded.token_type,
                expires_at = excluded.expires_at,
                scopes = excluded.scopes,
                updated_at = excluded.updated_at
            ",
        )
        .bind(record.user_id.to_string())
        .bind(&record.access_token)
        .bind(record.refresh_token.as_deref())
        .bind(&record.token_type)
        .bind(record.expires_at)
        .bind(record.scopes.join(" "))
        .bind(record.updated_at)
        .execute(&self.pool)
        .await?;

        self.get_token(record.user_id).await?.ok_or_else(|| {
            AppError::database(format!("Token row for user {} vanished after upsert", record.user_id))
        })
    }

    /// Get the token row of a user
    ///
    /// # Errors
    ///
    /// Returns an error if the query fails or the row is malformed
    pub async fn get_token(&self, user_id: Uuid) -> AppResult<Option<TokenRecord>> {
        let row = sqlx::query(
            r"
            SELECT user_id, access_token, refresh_token, token_type, expires_at, scopes, updated_at
            FROM tesla_tokens
            WHERE user_id = $1
            ",
        )
        .bind(user_id.to_string())
        .fetch_optional(&self.pool)
        .await?;

        row.as_ref().map(Self::row_to_token).transpose()
    }

    /// Delete the token row of a user; deleting a missing row succeeds
    ///
    /// # Errors
    ///
    /// Returns an error if the database operation fails
    pub async fn delete_token(&self, user_id: Uuid) -> AppResult<bool> {
        let result = sqlx::query("DELETE FROM tesla_tokens WHERE user_id = $1")
            .bind(user_id.to_string())
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    fn row_to_token(row: &SqliteRow) -> AppResult<TokenRecord> {
        let user_id: String = row.try_get("user_id")?;
        let scopes: String = row.try_get("scopes")?;
        Ok(TokenRecord {
            user_id: parse_uuid(&user_id)?,
            access_token: row.try_get("access_token")?,
            refresh_token: row.try_get("refresh_token")?,
            token_type: row.try_get("token_type")?,
            expires_at: row.try_get("expires_at")?,
            scopes: scopes.split_whitespace().map(str::to_owned).collect(),
            updated_at: row.try_get("updated_at")?,
        })
    }
}
