// ABOUTME: Tests for partner domain registration against a mock Fleet API
// ABOUTME: Covers first registration, 409 idempotency, status lookups and rejected registrations
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod common;

use std::sync::atomic::Ordering;
use std::sync::Arc;

use common::{start_time, ScriptedProvider};
use fleet_auth_broker::{
    oauth::{OAuthError, PartnerRegistrar, RegistrationResult},
    utils::clock::ManualClock,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn registrar_for(server: &MockServer, provider: &Arc<ScriptedProvider>) -> PartnerRegistrar {
    PartnerRegistrar::new(
        provider.clone(),
        reqwest::Client::new(),
        format!("{}/", server.uri()),
        "https://fleet-api.example.test",
        Arc::new(ManualClock::new(start_time())),
    )
}

#[tokio::test]
async fn test_register_then_already_registered() {
    let server = MockServer::start().await;
    let provider = ScriptedProvider::new();

    Mock::given(method("POST"))
        .and(path("/api/1/partner_accounts"))
        .and(header("authorization", "Bearer partner-token"))
        .and(body_json(json!({ "domain": "fleet.example.com" })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "domain": "fleet.example.com" }
        })))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/1/partner_accounts"))
        .respond_with(ResponseTemplate::new(409))
        .mount(&server)
        .await;

    let registrar = registrar_for(&server, &provider);
    assert!(!registrar.is_registered());

    let first = registrar.register_domain("fleet.example.com").await.unwrap();
    match first {
        RegistrationResult::Registered(body) => {
            assert_eq!(body["response"]["domain"], "fleet.example.com");
        }
        RegistrationResult::AlreadyRegistered => panic!("first registration should be new"),
    }
    assert!(registrar.is_registered());

    let second = registrar.register_domain("fleet.example.com").await.unwrap();
    assert_eq!(second, RegistrationResult::AlreadyRegistered);
    assert_eq!(provider.client_credentials_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_rejected_registration_fails() {
    let server = MockServer::start().await;
    let provider = ScriptedProvider::new();
    Mock::given(method("POST"))
        .and(path("/api/1/partner_accounts"))
        .respond_with(ResponseTemplate::new(422).set_body_string("domain has no public key"))
        .mount(&server)
        .await;

    let registrar = registrar_for(&server, &provider);
    let err = registrar.register_domain("fleet.example.com").await.unwrap_err();

    assert!(matches!(err, OAuthError::RegistrationFailed(_)));
    assert!(!registrar.is_registered());

    // Startup registration only logs the failure
    registrar.register_on_startup("fleet.example.com").await;
}

#[tokio::test]
async fn test_registration_status_lookup() {
    let server = MockServer::start().await;
    let provider = ScriptedProvider::new();
    Mock::given(method("GET"))
        .and(path("/api/1/partner_accounts/public_key"))
        .and(query_param("domain", "fleet.example.com"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "response": { "public_key": "04abcdef" }
        })))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/1/partner_accounts/public_key"))
        .and(query_param("domain", "unknown.example.com"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;

    let registrar = registrar_for(&server, &provider);

    let registered = registrar
        .registration_status("fleet.example.com")
        .await
        .unwrap();
    assert!(registered.registered);
    assert_eq!(
        registered.public_key,
        Some(json!({ "public_key": "04abcdef" }))
    );

    let unknown = registrar
        .registration_status("unknown.example.com")
        .await
        .unwrap();
    assert!(!unknown.registered);
    assert!(unknown.public_key.is_none());
    assert_eq!(unknown.domain, "unknown.example.com");
}

#[test]
fn test_virtual_key_url_uses_domain() {
    assert_eq!(
        PartnerRegistrar::virtual_key_url("fleet.example.com"),
        "https://tesla.com/_ak/fleet.example.com"
    );
}
