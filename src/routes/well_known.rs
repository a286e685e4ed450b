// ABOUTME: Serves the partner public key at the well-known path the Fleet API fetches
// ABOUTME: The PEM file is read on each request so a rotated key needs no restart
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::io::ErrorKind;
use std::sync::Arc;

use axum::{
    extract::State,
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::get,
    Router,
};
use tracing::{debug, error, warn};

use crate::constants::tesla::PUBLIC_KEY_WELL_KNOWN_PATH;
use crate::resources::ServerResources;

const TEXT_PLAIN: &str = "text/plain; charset=utf-8";

/// Well-known routes
pub struct WellKnownRoutes;

impl WellKnownRoutes {
    /// Create the public key route
    pub fn routes(resources: Arc<ServerResources>) -> Router {
        Router::new()
            .route(PUBLIC_KEY_WELL_KNOWN_PATH, get(Self::handle_public_key))
            .with_state(resources)
    }

    async fn handle_public_key(State(resources): State<Arc<ServerResources>>) -> Response {
        let path = &resources.config.tesla.public_key_path;

        match tokio::fs::read_to_string(path).await {
            Ok(pem) => {
                debug!(path = %path.display(), "Served partner public key");
                (StatusCode::OK, [(header::CONTENT_TYPE, TEXT_PLAIN)], pem).into_response()
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                warn!(path = %path.display(), "Partner public key file not found");
                (
                    StatusCode::NOT_FOUND,
                    [(header::CONTENT_TYPE, TEXT_PLAIN)],
                    "Public key not found",
                )
                    .into_response()
            }
            Err(e) => {
                error!(path = %path.display(), error = %e, "Failed to read partner public key");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    [(header::CONTENT_TYPE, TEXT_PLAIN)],
                    "Error reading public key",
                )
                    .into_response()
            }
        }
    }
}
