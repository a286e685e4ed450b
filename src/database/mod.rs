// ABOUTME: SQLite database manager for users, provider tokens, vehicles and telemetry
// ABOUTME: Owns the connection pool and runs idempotent schema migrations at startup
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Database Management
//!
//! All SQL lives in this module, split by table. Identifiers are stored as UUID
//! strings, timestamps as RFC 3339 text and scopes as a space-joined string.

mod telemetry;
mod tokens;
mod users;
mod vehicles;

use std::path::Path;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::{Pool, Sqlite, SqlitePool};
use tracing::info;

use crate::config::DatabaseUrl;
use crate::errors::{AppError, AppResult};

/// Database manager for the broker's tables
#[derive(Clone)]
pub struct Database {
    pool: Pool<Sqlite>,
}

impl Database {
    /// Open the database and run migrations
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or a migration fails
    pub async fn new(database_url: &DatabaseUrl) -> AppResult<Self> {
        let pool = match database_url {
            // A single connection that never idles out keeps the in-memory database alive
            DatabaseUrl::Memory => {
                SqlitePoolOptions::new()
                    .max_connections(1)
                    .idle_timeout(None)
                    .max_lifetime(None)
                    .connect("sqlite::memory:")
                    .await?
            }
            DatabaseUrl::SQLite { path } => {
                Self::ensure_parent_dir(path)?;
                // Ensure SQLite creates the database file if it doesn't exist
                SqlitePool::connect(&format!("sqlite:{}?mode=rwc", path.display())).await?
            }
        };

        let db = Self { pool };
        db.migrate().await?;
        info!(database = ?database_url, "Database ready");
        Ok(db)
    }

    /// Get a reference to the database pool for advanced operations
    #[must_use]
    pub const fn pool(&self) -> &Pool<Sqlite> {
        &self.pool
    }

    /// Run database migrations
    ///
    /// # Errors
    ///
    /// Returns an error if any table or index creation fails
    pub async fn migrate(&self) -> AppResult<()> {
        self.migrate_users().await?;
        self.migrate_tokens().await?;
        self.migrate_vehicles().await?;
        self.migrate_telemetry().await?;
        Ok(())
    }

    /// Check that the database answers queries
    ///
    /// # Errors
    ///
    /// Returns an error if the probe query fails
    pub async fn ping(&self) -> AppResult<()> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }

    fn ensure_parent_dir(path: &Path) -> AppResult<()> {
        match path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() && !dir.exists() => {
                std::fs::create_dir_all(dir).map_err(|e| {
                    AppError::storage(format!(
                        "Failed to create database directory {}: {e}",
                        dir.display()
                    ))
                })
            }
            _ => Ok(()),
        }
    }
}

/// Parse a stored UUID column
pub(crate) fn parse_uuid(value: &str) -> AppResult<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| AppError::database(format!("Invalid UUID in database '{value}': {e}")))
}
