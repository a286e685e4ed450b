// ABOUTME: Route module organization for the Fleet Auth Broker HTTP endpoints
// ABOUTME: Groups routes by domain and assembles them under the configured API base path
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! Route module for the Fleet Auth Broker
//!
//! Each domain module contains only route definitions and thin handler functions
//! that delegate to the token lifecycle manager, the registrar, the vehicle
//! provider or the database.

/// Login, callback, refresh, logout and status routes
pub mod auth;
/// Health check and service info routes
pub mod health;
/// Partner registration routes
pub mod partner;
/// Telemetry ingest and query routes
pub mod telemetry;
/// Vehicle list, data, metrics and wake routes
pub mod vehicles;
/// Partner public key route
pub mod well_known;

pub use auth::AuthRoutes;
pub use health::HealthRoutes;
pub use partner::PartnerRoutes;
pub use telemetry::TelemetryRoutes;
pub use vehicles::VehicleRoutes;
pub use well_known::WellKnownRoutes;

use std::sync::Arc;

use axum::Router;

use crate::resources::ServerResources;

/// All API routes, relative to the API base path
pub fn api_routes(resources: &Arc<ServerResources>) -> Router {
    Router::new()
        .merge(AuthRoutes::routes(Arc::clone(resources)))
        .merge(VehicleRoutes::routes(Arc::clone(resources)))
        .merge(PartnerRoutes::routes(Arc::clone(resources)))
        .merge(TelemetryRoutes::routes(Arc::clone(resources)))
}

/// Complete application routes: API routes nested under `api_base_path` plus the
/// top-level health, info and well-known routes
pub fn app_routes(resources: &Arc<ServerResources>) -> Router {
    let api = api_routes(resources);
    let base = resources.config.api_base_path.as_str();

    let router = if base == "/" || base.is_empty() {
        Router::new().merge(api)
    } else {
        Router::new().nest(base, api)
    };

    router
        .merge(HealthRoutes::routes(Arc::clone(resources)))
        .merge(WellKnownRoutes::routes(Arc::clone(resources)))
}
