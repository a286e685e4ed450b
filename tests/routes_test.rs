// ABOUTME: HTTP route tests driving the complete router with in-process requests
// ABOUTME: Covers health, login and callback, session auth, vehicles, partner, telemetry and public key routes
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::io::Write;

use anyhow::Result;
use axum::{
    body::{to_bytes, Body},
    http::{header, HeaderMap, Method, Request, StatusCode},
    Router,
};
use common::{create_test_resources, test_server_config};
use fleet_auth_broker::{config::ServerConfig, providers::MockVehicleProvider, server};
use serde_json::{json, Value};
use tower::ServiceExt;

struct TestResponse {
    status: StatusCode,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl TestResponse {
    fn json(&self) -> Value {
        serde_json::from_slice(&self.body).unwrap()
    }

    fn text(&self) -> String {
        String::from_utf8(self.body.clone()).unwrap()
    }
}

async fn app_with(config: ServerConfig) -> Result<Router> {
    let (resources, _provider, _clock) = create_test_resources(config).await?;
    Ok(server::build_router(&resources))
}

async fn send(app: &Router, request: Request<Body>) -> TestResponse {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    TestResponse {
        status,
        headers,
        body: body.to_vec(),
    }
}

async fn get(app: &Router, uri: &str, token: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(Method::GET).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

async fn post(app: &Router, uri: &str, token: Option<&str>) -> TestResponse {
    let mut builder = Request::builder().method(Method::POST).uri(uri);
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {token}"));
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

/// Run login and callback through the router, returning the app session token
async fn login(app: &Router) -> String {
    let login = get(app, "/api/v1/auth/tesla/login", None).await;
    assert_eq!(login.status, StatusCode::OK);
    let state = login.json()["state"].as_str().unwrap().to_owned();

    let callback = get(
        app,
        &format!("/api/v1/auth/tesla/callback?code=auth-code&state={state}"),
        None,
    )
    .await;
    assert_eq!(callback.status, StatusCode::OK, "{}", callback.text());
    callback.json()["token"].as_str().unwrap().to_owned()
}

#[tokio::test]
async fn test_health_and_service_info() -> Result<()> {
    let app = app_with(test_server_config()).await?;

    let health = get(&app, "/health", None).await;
    assert_eq!(health.status, StatusCode::OK);
    let body = health.json();
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["environment"], "development");

    let root = get(&app, "/", None).await;
    assert_eq!(root.status, StatusCode::OK);
    let body = root.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["endpoints"]["auth"], "/api/v1/auth");
    Ok(())
}

#[tokio::test]
async fn test_request_id_is_generated_and_echoed() -> Result<()> {
    let app = app_with(test_server_config()).await?;

    let generated = get(&app, "/health", None).await;
    assert!(generated.headers.contains_key("x-request-id"));

    let request = Request::builder()
        .uri("/health")
        .header("x-request-id", "req-from-client")
        .body(Body::empty())?;
    let echoed = send(&app, request).await;
    assert_eq!(echoed.headers["x-request-id"], "req-from-client");
    Ok(())
}

#[tokio::test]
async fn test_login_returns_authorization_url() -> Result<()> {
    let app = app_with(test_server_config()).await?;

    let response = get(&app, "/api/v1/auth/tesla/login", None).await;
    assert_eq!(response.status, StatusCode::OK);

    let body = response.json();
    let state = body["state"].as_str().unwrap();
    let auth_url = body["authUrl"].as_str().unwrap();
    assert_eq!(state.len(), 32);
    assert!(auth_url.contains(state));
    Ok(())
}

#[tokio::test]
async fn test_callback_then_status() -> Result<()> {
    let app = app_with(test_server_config()).await?;
    let token = login(&app).await;

    let status = get(&app, "/api/v1/auth/status", Some(&token)).await;
    assert_eq!(status.status, StatusCode::OK);
    let body = status.json();
    assert_eq!(body["isAuthenticated"], true);
    assert_eq!(body["needsRefresh"], false);
    assert!(body["user"]["email"]
        .as_str()
        .unwrap()
        .ends_with("@users.invalid"));
    assert!(body["expiresAt"].is_string());
    Ok(())
}

#[tokio::test]
async fn test_callback_response_hides_provider_tokens() -> Result<()> {
    let app = app_with(test_server_config()).await?;
    let login = get(&app, "/api/v1/auth/tesla/login", None).await;
    let state = login.json()["state"].as_str().unwrap().to_owned();

    let callback = get(
        &app,
        &format!("/api/v1/auth/tesla/callback?code=auth-code&state={state}"),
        None,
    )
    .await;
    let text = callback.text();
    assert!(!text.contains("access-initial"));
    assert!(!text.contains("refresh-initial"));
    assert_eq!(callback.json()["providerToken"]["tokenType"], "Bearer");
    Ok(())
}

#[tokio::test]
async fn test_callback_errors_map_to_bad_request() -> Result<()> {
    let app = app_with(test_server_config()).await?;

    let unknown = get(
        &app,
        "/api/v1/auth/tesla/callback?code=auth-code&state=deadbeef",
        None,
    )
    .await;
    assert_eq!(unknown.status, StatusCode::BAD_REQUEST);
    assert_eq!(unknown.json()["success"], false);

    let denied = get(
        &app,
        "/api/v1/auth/tesla/callback?error=access_denied&state=deadbeef",
        None,
    )
    .await;
    assert_eq!(denied.status, StatusCode::BAD_REQUEST);

    let missing = get(&app, "/api/v1/auth/tesla/callback", None).await;
    assert_eq!(missing.status, StatusCode::BAD_REQUEST);
    Ok(())
}

#[tokio::test]
async fn test_callback_redirects_to_app_when_configured() -> Result<()> {
    let mut config = test_server_config();
    config.app_callback_url = Some("https://app.example.com/auth/done".into());
    let app = app_with(config).await?;

    let login = get(&app, "/api/v1/auth/tesla/login", None).await;
    let state = login.json()["state"].as_str().unwrap().to_owned();
    let callback = get(
        &app,
        &format!("/api/v1/auth/tesla/callback?code=auth-code&state={state}"),
        None,
    )
    .await;

    assert_eq!(callback.status, StatusCode::FOUND);
    let location = callback.headers[header::LOCATION].to_str()?;
    assert!(location.starts_with("https://app.example.com/auth/done?token="));
    assert!(location.contains("&userId="));
    Ok(())
}

#[tokio::test]
async fn test_session_routes_require_bearer_token() -> Result<()> {
    let app = app_with(test_server_config()).await?;

    let missing = get(&app, "/api/v1/auth/status", None).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);
    assert_eq!(missing.json()["success"], false);

    let garbage = get(&app, "/api/v1/auth/status", Some("not-a-jwt")).await;
    assert_eq!(garbage.status, StatusCode::UNAUTHORIZED);

    let request = Request::builder()
        .uri("/api/v1/vehicles")
        .header(header::AUTHORIZATION, "Basic dXNlcjpwYXNz")
        .body(Body::empty())?;
    assert_eq!(send(&app, request).await.status, StatusCode::UNAUTHORIZED);

    assert_eq!(
        post(&app, "/api/v1/partner/register", None).await.status,
        StatusCode::UNAUTHORIZED
    );
    Ok(())
}

#[tokio::test]
async fn test_refresh_and_logout() -> Result<()> {
    let (resources, provider, _clock) = create_test_resources(test_server_config()).await?;
    let app = server::build_router(&resources);
    let token = login(&app).await;

    let refreshed = post(&app, "/api/v1/auth/refresh", Some(&token)).await;
    assert_eq!(refreshed.status, StatusCode::OK);
    assert_eq!(refreshed.json()["message"], "Token refreshed successfully");
    assert_eq!(provider.refreshes(), 1);

    let logout = post(&app, "/api/v1/auth/logout", Some(&token)).await;
    assert_eq!(logout.status, StatusCode::OK);
    assert_eq!(provider.revocations(), 1);

    // The app session outlives the provider tokens
    let status = get(&app, "/api/v1/auth/status", Some(&token)).await;
    assert_eq!(status.status, StatusCode::OK);
    assert_eq!(status.json()["isAuthenticated"], false);

    let refresh_again = post(&app, "/api/v1/auth/refresh", Some(&token)).await;
    assert_eq!(refresh_again.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_vehicle_routes_with_mock_provider() -> Result<()> {
    let app = app_with(test_server_config()).await?;
    let token = login(&app).await;

    let list = get(&app, "/api/v1/vehicles", Some(&token)).await;
    assert_eq!(list.status, StatusCode::OK);
    let body = list.json();
    let vehicles = body["vehicles"].as_array().unwrap();
    assert_eq!(vehicles.len(), 1);
    assert_eq!(vehicles[0]["vin"], MockVehicleProvider::VIN);
    let vehicle_id = vehicles[0]["id"].as_str().unwrap().to_owned();

    let data = get(&app, &format!("/api/v1/vehicles/{vehicle_id}"), Some(&token)).await;
    assert_eq!(data.status, StatusCode::OK);
    assert!(data.json()["vehicle"]["charge_state"].is_object());

    let metrics = get(
        &app,
        &format!("/api/v1/vehicles/{vehicle_id}/metrics?period=all-time"),
        Some(&token),
    )
    .await;
    assert_eq!(metrics.status, StatusCode::OK);
    let body = metrics.json();
    assert_eq!(body["metrics"]["period"], "all-time");
    assert_eq!(body["metrics"]["current"]["batteryLevel"], 74.0);

    let wake = post(&app, &format!("/api/v1/vehicles/{vehicle_id}/wake"), Some(&token)).await;
    assert_eq!(wake.status, StatusCode::OK);
    assert_eq!(wake.json()["state"], "online");

    let bad_id = get(&app, "/api/v1/vehicles/123456789", Some(&token)).await;
    assert_eq!(bad_id.status, StatusCode::NOT_FOUND);

    let unknown = get(
        &app,
        &format!("/api/v1/vehicles/{}", uuid::Uuid::new_v4()),
        Some(&token),
    )
    .await;
    assert_eq!(unknown.status, StatusCode::NOT_FOUND);
    Ok(())
}

#[tokio::test]
async fn test_vehicles_require_connected_provider() -> Result<()> {
    let app = app_with(test_server_config()).await?;
    let token = login(&app).await;
    assert_eq!(
        post(&app, "/api/v1/auth/logout", Some(&token)).await.status,
        StatusCode::OK
    );

    let list = get(&app, "/api/v1/vehicles", Some(&token)).await;
    assert_eq!(list.status, StatusCode::UNAUTHORIZED);
    Ok(())
}

#[tokio::test]
async fn test_partner_virtual_key_url_is_public() -> Result<()> {
    let app = app_with(test_server_config()).await?;

    let response = get(&app, "/api/v1/partner/virtual-key-url", None).await;
    assert_eq!(response.status, StatusCode::OK);
    let body = response.json();
    assert_eq!(body["domain"], "broker.example.test");
    assert_eq!(body["url"], "https://tesla.com/_ak/broker.example.test");
    Ok(())
}

fn ingest_request(secret: Option<&str>, body: &Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/telemetry/ingest")
        .header(header::CONTENT_TYPE, "application/json")
        .header("x-request-id", "req-telemetry-1");
    if let Some(secret) = secret {
        builder = builder.header("x-telemetry-secret", secret);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

#[tokio::test]
async fn test_oversized_body_is_rejected_by_middleware_stack() -> Result<()> {
    let app = app_with(test_server_config()).await?;
    let body = vec![b' '; 2 * 1024 * 1024];
    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/v1/telemetry/ingest")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::CONTENT_LENGTH, body.len())
        .header("x-request-id", "req-oversized")
        .body(Body::from(body))
        .unwrap();

    let response = send(&app, request).await;
    assert_eq!(response.status, StatusCode::PAYLOAD_TOO_LARGE);
    assert_eq!(response.headers["x-request-id"], "req-oversized");
    Ok(())
}

#[tokio::test]
async fn test_telemetry_ingest_checks_secret_and_shape() -> Result<()> {
    let mut config = test_server_config();
    config.telemetry_ingest_secret = Some("ingest-secret".into());
    let app = app_with(config).await?;
    let payload = json!({ "vin": MockVehicleProvider::VIN, "speed": 42 });

    let missing = send(&app, ingest_request(None, &payload)).await;
    assert_eq!(missing.status, StatusCode::UNAUTHORIZED);

    let wrong = send(&app, ingest_request(Some("guess"), &payload)).await;
    assert_eq!(wrong.status, StatusCode::UNAUTHORIZED);

    let not_object = send(&app, ingest_request(Some("ingest-secret"), &json!([1, 2, 3]))).await;
    assert_eq!(not_object.status, StatusCode::BAD_REQUEST);

    let accepted = send(&app, ingest_request(Some("ingest-secret"), &payload)).await;
    assert_eq!(accepted.status, StatusCode::OK);
    let body = accepted.json();
    assert_eq!(body["message"], "Telemetry received");
    assert_eq!(body["requestId"], "req-telemetry-1");
    Ok(())
}

#[tokio::test]
async fn test_recent_telemetry_for_owned_vehicles() -> Result<()> {
    let app = app_with(test_server_config()).await?;
    let token = login(&app).await;

    // Listing vehicles links the mock VIN to this user
    assert_eq!(
        get(&app, "/api/v1/vehicles", Some(&token)).await.status,
        StatusCode::OK
    );

    for payload in [
        json!({ "vin": MockVehicleProvider::VIN, "speed": 10 }),
        json!({ "VIN": MockVehicleProvider::VIN, "speed": 20, "source": "fleet-telemetry" }),
        json!({ "vin": "SOMEONE-ELSES-VIN", "speed": 30 }),
    ] {
        let response = send(&app, ingest_request(None, &payload)).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    let recent = get(&app, "/api/v1/telemetry/recent?limit=5", Some(&token)).await;
    assert_eq!(recent.status, StatusCode::OK);
    let body = recent.json();
    assert_eq!(body["meta"]["limit"], 5);
    assert_eq!(body["meta"]["count"], 2);
    let events = body["events"].as_array().unwrap();
    assert!(events
        .iter()
        .all(|e| e["vin"] == MockVehicleProvider::VIN));
    assert!(events
        .iter()
        .any(|e| e["source"] == "fleet-telemetry"));
    assert!(events.iter().all(|e| e["payload"]["_received_at"].is_string()));
    Ok(())
}

#[tokio::test]
async fn test_public_key_route() -> Result<()> {
    let mut config = test_server_config();
    config.tesla.public_key_path = "/nonexistent/fleet-auth-broker/public-key.pem".into();
    let app = app_with(config).await?;
    let path = "/.well-known/appspecific/com.tesla.3p.public-key.pem";

    let missing = get(&app, path, None).await;
    assert_eq!(missing.status, StatusCode::NOT_FOUND);

    let pem = "-----BEGIN PUBLIC KEY-----\nMFkwEwYHKoZIzj0CAQ==\n-----END PUBLIC KEY-----\n";
    let mut file = tempfile::NamedTempFile::new()?;
    file.write_all(pem.as_bytes())?;

    let mut config = test_server_config();
    config.tesla.public_key_path = file.path().to_path_buf();
    let app = app_with(config).await?;

    let served = get(&app, path, None).await;
    assert_eq!(served.status, StatusCode::OK);
    assert_eq!(served.text(), pem);
    assert!(served.headers[header::CONTENT_TYPE]
        .to_str()?
        .starts_with("text/plain"));
    Ok(())
}
