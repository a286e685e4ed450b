// ABOUTME: Health check and service info route handlers
// ABOUTME: Health pings the database so load balancers see storage outages
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Health check routes for service monitoring
//!
//! `/health` answers 200 while the database responds and 503 otherwise. `/`
//! describes the service and where its endpoint groups live.

use std::sync::Arc;

use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde_json::json;
use tracing::error;

use crate::constants::service_names::API_DISPLAY_NAME;
use crate::resources::ServerResources;

/// Health routes implementation
pub struct HealthRoutes;

impl HealthRoutes {
    /// Create all health check routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/", get(Self::handle_root))
            .route("/health", get(Self::handle_health))
            .with_state(resources)
    }

    async fn handle_health(State(resources): State<Arc<ServerResources>>) -> Response {
        match resources.database.ping().await {
            Ok(()) => (
                StatusCode::OK,
                Json(json!({
                    "success": true,
                    "status": "healthy",
                    "timestamp": resources.clock.now().to_rfc3339(),
                    "environment": resources.config.environment.to_string(),
                })),
            )
                .into_response(),
            Err(e) => {
                error!(error = %e, "Health check failed: database unreachable");
                (
                    StatusCode::SERVICE_UNAVAILABLE,
                    Json(json!({
                        "success": false,
                        "status": "unhealthy",
                        "error": "Database connection failed",
                    })),
                )
                    .into_response()
            }
        }
    }

    async fn handle_root(State(resources): State<Arc<ServerResources>>) -> Json<serde_json::Value> {
        let base = &resources.config.api_base_path;
        Json(json!({
            "success": true,
            "message": API_DISPLAY_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "endpoints": {
                "health": "/health",
                "auth": format!("{base}/auth"),
                "vehicles": format!("{base}/vehicles"),
                "partner": format!("{base}/partner"),
                "telemetry": format!("{base}/telemetry"),
            },
        }))
    }
}
