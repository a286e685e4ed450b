// ABOUTME: Telemetry ingest and recent-events route handlers
// ABOUTME: Ingest is guarded by an optional shared secret compared in constant time
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Telemetry routes
//!
//! `POST /telemetry/ingest` accepts any JSON object from a relay or a manual test;
//! `GET /telemetry/recent` lets a signed-in user verify that events for their
//! vehicles are arriving.

use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use subtle::ConstantTimeEq;
use tracing::{info, warn};
use uuid::Uuid;

use crate::constants::headers::{REQUEST_ID, TELEMETRY_SECRET};
use crate::constants::limits::{DEFAULT_TELEMETRY_LIMIT, MAX_TELEMETRY_LIMIT};
use crate::errors::{AppError, ErrorCode};
use crate::models::NewTelemetryEvent;
use crate::resources::ServerResources;

/// Source recorded when the payload does not name one
const DEFAULT_SOURCE: &str = "ingest";

/// Query parameters of the recent endpoint
#[derive(Debug, Default, Deserialize)]
pub struct RecentQuery {
    /// Maximum number of events (kept as text so garbage falls back to the default)
    pub limit: Option<String>,
}

impl RecentQuery {
    /// Effective limit: the default for missing, zero or unparseable values, capped
    #[must_use]
    pub fn effective_limit(&self) -> u32 {
        self.limit
            .as_deref()
            .and_then(|raw| raw.trim().parse::<u32>().ok())
            .filter(|limit| *limit > 0)
            .unwrap_or(DEFAULT_TELEMETRY_LIMIT)
            .min(MAX_TELEMETRY_LIMIT)
    }
}

/// Telemetry routes
pub struct TelemetryRoutes;

impl TelemetryRoutes {
    /// Create all telemetry routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/telemetry/ingest", post(Self::handle_ingest))
            .route("/telemetry/recent", get(Self::handle_recent))
            .with_state(resources)
    }

    async fn handle_ingest(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
        body: Bytes,
    ) -> Result<Response, AppError> {
        let request_id = headers
            .get(REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map_or_else(|| format!("ingest-{}", Uuid::new_v4().simple()), str::to_owned);

        if let Some(expected) = resources.config.telemetry_ingest_secret.as_deref() {
            let presented = headers
                .get(TELEMETRY_SECRET)
                .map_or(&[][..], |v| v.as_bytes());
            if !bool::from(presented.ct_eq(expected.as_bytes())) {
                warn!(request_id = %request_id, "Telemetry ingest rejected: missing or invalid secret");
                return Err(AppError::new(ErrorCode::AuthInvalid, "Unauthorized")
                    .with_request_id(request_id));
            }
        }

        let Ok(Value::Object(mut payload)) = serde_json::from_slice::<Value>(&body) else {
            warn!(request_id = %request_id, "Telemetry ingest rejected: body must be a JSON object");
            return Err(
                AppError::invalid_input("Body must be a JSON object").with_request_id(request_id)
            );
        };

        let vin = ["vin", "VIN"]
            .iter()
            .find_map(|key| payload.get(*key).and_then(Value::as_str))
            .filter(|vin| !vin.is_empty())
            .map(str::to_owned);
        let source = payload
            .get("source")
            .and_then(Value::as_str)
            .filter(|source| !source.is_empty())
            .unwrap_or(DEFAULT_SOURCE)
            .to_owned();
        let keys: Vec<String> = payload
            .keys()
            .filter(|k| !k.starts_with('_'))
            .take(10)
            .cloned()
            .collect();

        let received_at = resources.clock.now();
        payload.insert("_received_at".into(), json!(received_at.to_rfc3339()));

        let event = NewTelemetryEvent {
            vin,
            source,
            payload: Value::Object(payload),
            received_at,
        };
        resources
            .database
            .insert_telemetry_event(&event)
            .await
            .map_err(|e| e.with_request_id(request_id.clone()))?;

        info!(
            request_id = %request_id,
            vin = event.vin.as_deref().unwrap_or("(none)"),
            keys = ?keys,
            "Telemetry ingest accepted"
        );

        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "message": "Telemetry received",
                "requestId": request_id,
            })),
        )
            .into_response())
    }

    async fn handle_recent(
        State(resources): State<Arc<ServerResources>>,
        Query(query): Query<RecentQuery>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;

        let limit = query.effective_limit();
        let events = resources
            .database
            .get_recent_telemetry_for_user(auth.user_id, limit)
            .await?;

        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "events": events,
                "meta": {
                    "limit": limit,
                    "count": events.len(),
                },
            })),
        )
            .into_response())
    }
}
