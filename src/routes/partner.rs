// ABOUTME: Partner registration route handlers for the Fleet API developer domain
// ABOUTME: Exposes the virtual key pairing link, domain registration and registration status
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::sync::Arc;

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;

use crate::errors::AppError;
use crate::oauth::{PartnerRegistrar, RegistrationResult};
use crate::resources::ServerResources;

/// Partner routes
pub struct PartnerRoutes;

impl PartnerRoutes {
    /// Create all partner routes
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route("/partner/virtual-key-url", get(Self::handle_virtual_key_url))
            .route("/partner/register", post(Self::handle_register))
            .route("/partner/status", get(Self::handle_status))
            .with_state(resources)
    }

    async fn handle_virtual_key_url(
        State(resources): State<Arc<ServerResources>>,
    ) -> Result<Response, AppError> {
        let domain = &resources.config.tesla.developer_domain;

        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "url": PartnerRegistrar::virtual_key_url(domain),
                "domain": domain,
                "message": "Open this link on a phone with the Tesla app to add the virtual key",
            })),
        )
            .into_response())
    }

    async fn handle_register(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;

        let domain = &resources.config.tesla.developer_domain;
        let body = match resources.registrar.register_domain(domain).await? {
            RegistrationResult::Registered(data) => json!({
                "success": true,
                "message": "Successfully registered with Tesla Fleet API",
                "domain": domain,
                "data": data,
            }),
            RegistrationResult::AlreadyRegistered => json!({
                "success": true,
                "message": "Already registered with Tesla Fleet API",
                "domain": domain,
            }),
        };

        Ok((StatusCode::OK, Json(body)).into_response())
    }

    async fn handle_status(
        State(resources): State<Arc<ServerResources>>,
        headers: HeaderMap,
    ) -> Result<Response, AppError> {
        resources
            .auth_middleware
            .authenticate_request_with_headers(&headers)?;

        let status = resources
            .registrar
            .registration_status(&resources.config.tesla.developer_domain)
            .await?;

        Ok((
            StatusCode::OK,
            Json(json!({
                "success": true,
                "registered": status.registered,
                "domain": status.domain,
                "publicKey": status.public_key,
            })),
        )
            .into_response())
    }
}
