// ABOUTME: Shared test utilities and setup functions for integration tests
// ABOUTME: Provides a scripted OAuth provider, a manual clock, an in-memory database and resources
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence
#![allow(
    dead_code,
    clippy::wildcard_in_or_patterns,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc,
    clippy::must_use_candidate,
    clippy::unwrap_used,
    clippy::expect_used
)]
//! Shared test utilities for `fleet_auth_broker`

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};
use std::time::Duration as StdDuration;

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Utc};
use fleet_auth_broker::{
    auth::AuthManager,
    config::{DatabaseUrl, ServerConfig, SessionStoreConfig, TeslaConfig},
    database_plugins::{DatabaseProvider, SqliteDatabase},
    oauth::{session_store::InMemorySessionStore, OAuthSessionStore, TokenLifecycleManager},
    oauth2_client::{OAuthClientError, OAuthProviderClient, RawTokenResponse},
    providers::MockVehicleProvider,
    resources::ServerResources,
    utils::clock::{Clock, ManualClock},
};
use serde_json::{json, Value};

static INIT_LOGGER: Once = Once::new();

/// JWT secret used by every test
pub const TEST_JWT_SECRET: &str = "test-jwt-secret-for-integration-tests";

/// Initialize quiet logging for tests (call once per test process)
pub fn init_test_logging() {
    INIT_LOGGER.call_once(|| {
        let log_level = match std::env::var("TEST_LOG").as_deref() {
            Ok("TRACE") => tracing::Level::TRACE,
            Ok("DEBUG") => tracing::Level::DEBUG,
            Ok("INFO") => tracing::Level::INFO,
            Ok("WARN" | "ERROR") | _ => tracing::Level::WARN,
        };

        tracing_subscriber::fmt()
            .with_max_level(log_level)
            .with_test_writer()
            .init();
    });
}

/// Fixed instant every manual clock starts at
pub fn start_time() -> DateTime<Utc> {
    DateTime::from_timestamp(1_700_000_000, 0).unwrap()
}

/// Build an unsigned id_token carrying `claims`
pub fn id_token(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.signature")
}

/// Token endpoint response
pub fn token_response(
    access_token: &str,
    refresh_token: Option<&str>,
    expires_in: i64,
    scope: Option<&str>,
) -> RawTokenResponse {
    RawTokenResponse {
        access_token: Some(access_token.to_owned()),
        refresh_token: refresh_token.map(str::to_owned),
        token_type: Some("Bearer".into()),
        expires_in: Some(json!(expires_in)),
        scope: scope.map(str::to_owned),
        id_token: None,
    }
}

type Scripted = Mutex<VecDeque<Result<RawTokenResponse, OAuthClientError>>>;

/// `OAuth` provider double answering from scripted queues
///
/// Empty queues fall back to a successful two hour grant. Every call is counted.
#[derive(Default)]
pub struct ScriptedProvider {
    exchange_responses: Scripted,
    refresh_responses: Scripted,
    fail_revoke: AtomicBool,
    refresh_delay_ms: AtomicU64,
    pub exchange_calls: AtomicUsize,
    pub refresh_calls: AtomicUsize,
    pub revoke_calls: AtomicUsize,
    pub client_credentials_calls: AtomicUsize,
    pub verifiers_seen: Mutex<Vec<String>>,
    pub refresh_tokens_seen: Mutex<Vec<String>>,
}

impl ScriptedProvider {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn push_exchange(&self, response: Result<RawTokenResponse, OAuthClientError>) {
        self.exchange_responses.lock().unwrap().push_back(response);
    }

    pub fn push_refresh(&self, response: Result<RawTokenResponse, OAuthClientError>) {
        self.refresh_responses.lock().unwrap().push_back(response);
    }

    pub fn fail_revocations(&self) {
        self.fail_revoke.store(true, Ordering::SeqCst);
    }

    /// Make every refresh take `delay` of wall time
    pub fn delay_refreshes(&self, delay: StdDuration) {
        self.refresh_delay_ms
            .store(delay.as_millis() as u64, Ordering::SeqCst);
    }

    pub fn exchanges(&self) -> usize {
        self.exchange_calls.load(Ordering::SeqCst)
    }

    pub fn refreshes(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn revocations(&self) -> usize {
        self.revoke_calls.load(Ordering::SeqCst)
    }

    pub fn status_error(endpoint: &'static str, status: u16) -> OAuthClientError {
        OAuthClientError::Status { endpoint, status }
    }
}

#[async_trait]
impl OAuthProviderClient for ScriptedProvider {
    fn provider_name(&self) -> &'static str {
        "scripted"
    }

    fn authorization_url(
        &self,
        state: &str,
        code_challenge: &str,
    ) -> Result<String, OAuthClientError> {
        Ok(format!(
            "https://auth.example.test/oauth2/v3/authorize?response_type=code&state={state}&code_challenge={code_challenge}&code_challenge_method=S256"
        ))
    }

    async fn exchange_code(
        &self,
        _code: &str,
        code_verifier: &str,
    ) -> Result<RawTokenResponse, OAuthClientError> {
        self.exchange_calls.fetch_add(1, Ordering::SeqCst);
        self.verifiers_seen
            .lock()
            .unwrap()
            .push(code_verifier.to_owned());
        let scripted = self.exchange_responses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(token_response(
                "access-initial",
                Some("refresh-initial"),
                7200,
                Some("openid offline_access vehicle_device_data"),
            ))
        })
    }

    async fn refresh_token(
        &self,
        refresh_token: &str,
    ) -> Result<RawTokenResponse, OAuthClientError> {
        let call = self.refresh_calls.fetch_add(1, Ordering::SeqCst) + 1;
        self.refresh_tokens_seen
            .lock()
            .unwrap()
            .push(refresh_token.to_owned());

        let delay = self.refresh_delay_ms.load(Ordering::SeqCst);
        if delay > 0 {
            tokio::time::sleep(StdDuration::from_millis(delay)).await;
        }

        let scripted = self.refresh_responses.lock().unwrap().pop_front();
        scripted.unwrap_or_else(|| {
            Ok(token_response(
                &format!("access-refreshed-{call}"),
                Some(&format!("refresh-rotated-{call}")),
                7200,
                None,
            ))
        })
    }

    async fn revoke_token(&self, _token: &str) -> Result<(), OAuthClientError> {
        self.revoke_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_revoke.load(Ordering::SeqCst) {
            return Err(Self::status_error("revoke", 500));
        }
        Ok(())
    }

    async fn client_credentials_token(
        &self,
        _scope: &str,
        _audience: &str,
    ) -> Result<RawTokenResponse, OAuthClientError> {
        self.client_credentials_calls.fetch_add(1, Ordering::SeqCst);
        Ok(token_response("partner-token", None, 28_800, None))
    }
}

/// Standard in-memory test database
pub async fn create_test_database() -> Result<Arc<dyn DatabaseProvider>> {
    init_test_logging();
    let database = SqliteDatabase::new(&DatabaseUrl::Memory).await?;
    Ok(Arc::new(database))
}

/// Session store without a background sweep, driven by `clock`
pub fn create_test_session_store(clock: Arc<dyn Clock>) -> Arc<dyn OAuthSessionStore> {
    let config = SessionStoreConfig {
        cleanup_interval_secs: 0,
        ..SessionStoreConfig::default()
    };
    Arc::new(InMemorySessionStore::new(&config, clock))
}

/// Everything a lifecycle test needs, wired around one manual clock
pub struct TestContext {
    pub database: Arc<dyn DatabaseProvider>,
    pub provider: Arc<ScriptedProvider>,
    pub sessions: Arc<dyn OAuthSessionStore>,
    pub clock: Arc<ManualClock>,
    pub auth: Arc<AuthManager>,
    pub manager: Arc<TokenLifecycleManager>,
}

impl TestContext {
    /// Run a full login and callback, returning the new user's id
    pub async fn login(&self) -> Result<uuid::Uuid> {
        let login = self.manager.initiate_login().await?;
        let outcome = self
            .manager
            .handle_callback(&fleet_auth_broker::oauth::CallbackParams {
                code: Some("auth-code".into()),
                state: Some(login.state),
                ..Default::default()
            })
            .await?;
        Ok(outcome.user.id)
    }
}

/// Build a lifecycle manager over an in-memory database and a scripted provider
pub async fn create_test_context(single_flight: bool) -> Result<TestContext> {
    let database = create_test_database().await?;
    let provider = ScriptedProvider::new();
    let clock = Arc::new(ManualClock::new(start_time()));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let sessions = create_test_session_store(Arc::clone(&dyn_clock));
    let auth = Arc::new(AuthManager::new(
        TEST_JWT_SECRET.as_bytes(),
        24,
        Arc::clone(&dyn_clock),
    ));

    let manager = Arc::new(TokenLifecycleManager::new(
        Arc::clone(&database),
        provider.clone(),
        Arc::clone(&sessions),
        dyn_clock,
        Arc::clone(&auth),
        single_flight,
    ));

    Ok(TestContext {
        database,
        provider,
        sessions,
        clock,
        auth,
        manager,
    })
}

/// Configuration used by router tests
pub fn test_server_config() -> ServerConfig {
    let mut tesla = TeslaConfig::new(
        "test-client",
        "test-secret",
        "https://broker.example.test/api/v1/auth/tesla/callback",
    );
    tesla.use_mock = true;
    tesla.register_on_startup = false;

    let mut config = ServerConfig::new(tesla);
    config.database_url = DatabaseUrl::Memory;
    config.auth.jwt_secret = TEST_JWT_SECRET.into();
    config.vehicle_wake_wait_secs = 0;
    config.oauth_sessions.cleanup_interval_secs = 0;
    config
}

/// Server resources around the scripted provider and the mock vehicle provider
pub async fn create_test_resources(
    config: ServerConfig,
) -> Result<(Arc<ServerResources>, Arc<ScriptedProvider>, Arc<ManualClock>)> {
    let database = create_test_database().await?;
    let provider = ScriptedProvider::new();
    let clock = Arc::new(ManualClock::new(start_time()));
    let dyn_clock: Arc<dyn Clock> = clock.clone();
    let sessions = create_test_session_store(Arc::clone(&dyn_clock));

    let resources = ServerResources::new(
        config,
        database,
        provider.clone(),
        sessions,
        Arc::new(MockVehicleProvider::new()),
        reqwest::Client::new(),
        dyn_clock,
    );

    Ok((Arc::new(resources), provider, clock))
}
