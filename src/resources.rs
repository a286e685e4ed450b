// ABOUTME: Centralized resource container for dependency injection into HTTP handlers
// ABOUTME: Builds the database, session store, token manager, registrar and vehicle provider once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

//! # Server Resources
//!
//! Every shared service is constructed once at startup and handed to the routes
//! through axum state. Tests build the same container around in-memory and
//! scripted collaborators with [`ServerResources::new`].

use std::sync::Arc;

use crate::auth::AuthManager;
use crate::config::ServerConfig;
use crate::database_plugins::{DatabaseProvider, SqliteDatabase};
use crate::errors::{AppError, AppResult};
use crate::middleware::AppSessionAuth;
use crate::oauth::session_store::create_session_store;
use crate::oauth::{OAuthSessionStore, PartnerRegistrar, TokenLifecycleManager};
use crate::oauth2_client::{OAuthProviderClient, TeslaOAuthClient};
use crate::providers::{create_vehicle_provider, VehicleDataProvider};
use crate::utils::clock::{Clock, SystemClock};
use crate::utils::http_client::oauth_client;

/// Centralized resource container for dependency injection
#[derive(Clone)]
pub struct ServerResources {
    /// Loaded configuration
    pub config: Arc<ServerConfig>,
    /// Persistence
    pub database: Arc<dyn DatabaseProvider>,
    /// App session issuer
    pub auth_manager: Arc<AuthManager>,
    /// Bearer authentication for protected routes
    pub auth_middleware: Arc<AppSessionAuth>,
    /// Provider token lifecycle
    pub token_manager: Arc<TokenLifecycleManager>,
    /// Partner registration
    pub registrar: Arc<PartnerRegistrar>,
    /// Vehicle data source
    pub vehicle_provider: Arc<dyn VehicleDataProvider>,
    /// Time source
    pub clock: Arc<dyn Clock>,
}

impl ServerResources {
    /// Assemble resources around injected collaborators
    #[must_use]
    pub fn new(
        config: ServerConfig,
        database: Arc<dyn DatabaseProvider>,
        oauth_provider: Arc<dyn OAuthProviderClient>,
        sessions: Arc<dyn OAuthSessionStore>,
        vehicle_provider: Arc<dyn VehicleDataProvider>,
        registrar_http: reqwest::Client,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let auth_manager = Arc::new(AuthManager::new(
            config.auth.jwt_secret.as_bytes(),
            config.auth.jwt_expiry_hours,
            Arc::clone(&clock),
        ));
        let auth_middleware = Arc::new(AppSessionAuth::new(Arc::clone(&auth_manager)));

        let token_manager = Arc::new(TokenLifecycleManager::new(
            Arc::clone(&database),
            Arc::clone(&oauth_provider),
            sessions,
            Arc::clone(&clock),
            Arc::clone(&auth_manager),
            config.token_refresh_single_flight,
        ));

        let registrar = Arc::new(PartnerRegistrar::new(
            oauth_provider,
            registrar_http,
            config.tesla.api_base_url.clone(),
            config.tesla.audience.clone(),
            Arc::clone(&clock),
        ));

        Self {
            config: Arc::new(config),
            database,
            auth_manager,
            auth_middleware,
            token_manager,
            registrar,
            vehicle_provider,
            clock,
        }
    }

    /// Build production resources from configuration
    ///
    /// # Errors
    ///
    /// Returns an error if the database cannot be opened or the session store
    /// backend cannot be reached
    pub async fn from_config(config: ServerConfig) -> AppResult<Self> {
        let clock: Arc<dyn Clock> = Arc::new(SystemClock);

        let database: Arc<dyn DatabaseProvider> =
            Arc::new(SqliteDatabase::new(&config.database_url).await?);

        let sessions = create_session_store(&config.oauth_sessions, Arc::clone(&clock))
            .await
            .map_err(AppError::from)?;

        let oauth_provider: Arc<dyn OAuthProviderClient> =
            Arc::new(TeslaOAuthClient::new(config.tesla.clone()));
        let vehicle_provider =
            create_vehicle_provider(&config.tesla, config.provider_timeout_secs);

        Ok(Self::new(
            config,
            database,
            oauth_provider,
            sessions,
            vehicle_provider,
            oauth_client(),
            clock,
        ))
    }
}
