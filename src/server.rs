// ABOUTME: HTTP server assembly: router, tower middleware stack and graceful shutdown
// ABOUTME: Request ids are generated, traced and echoed on every response
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # HTTP Server
//!
//! [`build_router`] produces the complete application (used as-is by router
//! tests) and [`serve`] binds it and runs until Ctrl-C or SIGTERM.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use axum::{body::Body, http::Request, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::{info, info_span, warn};

use crate::constants::headers::REQUEST_ID;
use crate::constants::network::{MAX_REQUEST_BODY_BYTES, SERVER_REQUEST_TIMEOUT_SECS};
use crate::middleware::setup_cors;
use crate::resources::ServerResources;
use crate::routes;

/// Build the application router with its middleware stack
pub fn build_router(resources: &Arc<ServerResources>) -> Router {
    let middleware = ServiceBuilder::new()
        .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
        .layer(
            TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                let request_id = request
                    .headers()
                    .get(REQUEST_ID)
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("-");
                info_span!(
                    "http_request",
                    method = %request.method(),
                    path = %request.uri().path(),
                    request_id = %request_id,
                )
            }),
        )
        .layer(PropagateRequestIdLayer::x_request_id())
        // Body limit sits outside the timeout: Timeout needs a Default response body
        .layer(RequestBodyLimitLayer::new(MAX_REQUEST_BODY_BYTES))
        .layer(TimeoutLayer::new(Duration::from_secs(
            SERVER_REQUEST_TIMEOUT_SECS,
        )))
        .layer(setup_cors(&resources.config));

    routes::app_routes(resources).layer(middleware)
}

/// Bind `port` on all interfaces and serve until a shutdown signal arrives
///
/// # Errors
///
/// Returns an error if the port cannot be bound or the server fails
pub async fn serve(resources: Arc<ServerResources>, port: u16) -> Result<()> {
    let app = build_router(&resources);

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind to {addr}"))?;

    info!("HTTP server listening on http://{addr}");
    log_endpoints(&resources.config.api_base_path, port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("HTTP server error")?;

    info!("HTTP server stopped");
    Ok(())
}

/// Resolves on Ctrl-C or SIGTERM
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {e}");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received Ctrl+C, shutting down"),
        () = terminate => info!("Received SIGTERM, shutting down"),
    }
}

#[allow(clippy::cognitive_complexity)]
fn log_endpoints(base: &str, port: u16) {
    info!("=== Available API Endpoints ===");
    info!("   Health:        GET  http://localhost:{port}/health");
    info!("   Login:         GET  http://localhost:{port}{base}/auth/tesla/login");
    info!("   Callback:      GET  http://localhost:{port}{base}/auth/tesla/callback");
    info!("   Auth Status:   GET  http://localhost:{port}{base}/auth/status");
    info!("   Vehicles:      GET  http://localhost:{port}{base}/vehicles");
    info!("   Partner:       GET  http://localhost:{port}{base}/partner/status");
    info!("   Telemetry:     POST http://localhost:{port}{base}/telemetry/ingest");
    info!("=== End of Endpoint List ===");
}
