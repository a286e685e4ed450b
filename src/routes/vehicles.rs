// ABOUTME: Vehicle route handlers consuming provider tokens through the lifecycle manager
// ABOUTME: Lists and syncs vehicles, fetches live data and metrics, and sends wake-up commands
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Vehicle routes
//!
//! Every handler obtains its access token from
//! [`TokenLifecycleManager::get_valid_access_token`](crate::oauth::TokenLifecycleManager::get_valid_access_token),
//! so an expiring provider token is refreshed before the Fleet API is called.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, info};
use uuid::Uuid;

use crate::errors::{AppError, AppResult};
use crate::models::Vehicle;
use crate::providers::{MetricsPeriod, MetricsReport};
use crate::resources::ServerResources;

/// Query parameters of the metrics endpoint
#[derive(Debug, Default, Deserialize)]
pub struct MetricsQuery {
    /// Reporting period, `trip` when omitted
    #[serde(default)]
    pub period: MetricsPeriod,
}

/// Vehicle routes
pub struct VehicleRoutes;

impl VehicleRoutes {
    /// Create all vehicle routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/vehicles", get(Self::handle_list))
            .route("/vehicles/:vehicle_id", get(Self::handle_vehicle_data))
            .route("/vehicles/:vehicle_id/metrics", get(Self::handle_metrics))
            .route("/vehicles/:vehicle_id/wake", post(Self::handle_wake))
            .with_state(resources)
    }

    async fn handle_list(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;
        let access_token = resources
            .token_manager
            .get_valid_access_token(auth.user_id)
            .await?;

        let listed = resources
            .vehicle_provider
            .list_vehicles(&access_token)
            .await?;

        let now = resources.clock.now();
        let mut vehicles = Vec::with_capacity(listed.len());
        for provider_vehicle in &listed {
            let row = provider_vehicle.to_new_vehicle(auth.user_id);
            vehicles.push(resources.database.upsert_vehicle(&row, now).await?);
        }

        info!(user_id = %auth.user_id, count = vehicles.len(), "Vehicles synchronized");
        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "vehicles": vehicles,
            })),
        )
            .into_response())
    }

    async fn handle_vehicle_data(
        State(resources): State<Arc<ServerResources>>,
        Path(vehicle_id): Path<String>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;
        let vehicle = Self::owned_vehicle(&resources, auth.user_id, &vehicle_id).await?;
        let access_token = resources
            .token_manager
            .get_valid_access_token(auth.user_id)
            .await?;

        let provider = &resources.vehicle_provider;
        let current = provider
            .get_vehicle(&access_token, vehicle.provider_vehicle_id)
            .await?;

        if !current.is_awake() {
            info!(vehicle_id = %vehicle.id, state = ?current.state, "Vehicle asleep, sending wake-up");
            provider
                .wake_up(&access_token, vehicle.provider_vehicle_id)
                .await?;
            tokio::time::sleep(Duration::from_secs(resources.config.vehicle_wake_wait_secs)).await;
        }

        let data = provider
            .vehicle_data(&access_token, vehicle.provider_vehicle_id)
            .await?;

        if let Some(state) = data.get("state").and_then(Value::as_str) {
            resources
                .database
                .update_vehicle_state(vehicle.id, state, resources.clock.now())
                .await?;
        }

        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "vehicle": data,
            })),
        )
            .into_response())
    }

    async fn handle_metrics(
        State(resources): State<Arc<ServerResources>>,
        Path(vehicle_id): Path<String>,
        Query(query): Query<MetricsQuery>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;
        let vehicle = Self::owned_vehicle(&resources, auth.user_id, &vehicle_id).await?;
        let access_token = resources
            .token_manager
            .get_valid_access_token(auth.user_id)
            .await?;

        let data = resources
            .vehicle_provider
            .vehicle_data(&access_token, vehicle.provider_vehicle_id)
            .await?;
        let metrics = resources
            .vehicle_provider
            .parse_metrics(&data, resources.clock.now());
        debug!(vehicle_id = %vehicle.id, ?metrics, "Parsed vehicle metrics");

        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "metrics": MetricsReport::build(&metrics, query.period),
            })),
        )
            .into_response())
    }

    async fn handle_wake(
        State(resources): State<Arc<ServerResources>>,
        Path(vehicle_id): Path<String>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        let auth = resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;
        let vehicle = Self::owned_vehicle(&resources, auth.user_id, &vehicle_id).await?;
        let access_token = resources
            .token_manager
            .get_valid_access_token(auth.user_id)
            .await?;

        let woken = resources
            .vehicle_provider
            .wake_up(&access_token, vehicle.provider_vehicle_id)
            .await?;

        if let Some(state) = woken.state.as_deref() {
            resources
                .database
                .update_vehicle_state(vehicle.id, state, resources.clock.now())
                .await?;
        }

        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "state": woken.state,
                "message": "Vehicle wake command sent",
            })),
        )
            .into_response())
    }

    /// Resolve a vehicle owned by the caller; foreign and unknown ids both yield 404
    async fn owned_vehicle(
        resources: &ServerResources,
        user_id: Uuid,
        vehicle_id: &str,
    ) -> AppResult<Vehicle> {
        let Ok(vehicle_id) = Uuid::parse_str(vehicle_id) else {
            return Err(AppError::not_found("Vehicle"));
        };

        resources
            .database
            .get_vehicle(user_id, vehicle_id)
            .await?
            .ok_or_else(|| AppError::not_found("Vehicle"))
    }
}
