// ABOUTME: Main library entry point for the fleet auth broker
// ABOUTME: Brokers Tesla Fleet API OAuth2/PKCE logins, keeps tokens fresh, and proxies vehicle data
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

#![recursion_limit = "256"]
#![deny(unsafe_code)]

//! # Fleet Auth Broker
//!
//! A backend that authenticates vehicle owners against the Tesla Fleet API using
//! `OAuth2` with `PKCE`, stores the issued tokens, and proxies vehicle data requests
//! on their behalf.
//!
//! ## Architecture
//!
//! - **`OAuth2` client**: `PKCE`/state generation, token codec, provider HTTP client
//! - **`OAuth`**: session store, token lifecycle manager, partner registrar
//! - **Providers**: mock and Fleet API vehicle data adapters
//! - **Database**: `SQLite` persistence for users, tokens, vehicles, telemetry
//! - **Routes**: axum REST surface with JWT app sessions
//!
//! Every caller that needs a provider access token goes through
//! [`oauth::manager::TokenLifecycleManager::get_valid_access_token`], which refreshes
//! transparently when the stored token is inside the expiry margin.
//!
//! ## Example Usage
//!
//! ```rust,no_run
//! use fleet_auth_broker::config::environment::ServerConfig;
//!
//! fn main() -> anyhow::Result<()> {
//!     let config = ServerConfig::from_env()?;
//!     println!("Fleet auth broker configured on port {}", config.http_port);
//!     Ok(())
//! }
//! ```

/// JWT app session tokens issued after a successful provider login
pub mod auth;

/// Environment-based configuration
pub mod config;

/// Application constants organized by domain
pub mod constants;

/// `SQLite` persistence for users, tokens, vehicles and telemetry
pub mod database;

/// Persistence abstraction consumed by the lifecycle manager and routes
pub mod database_plugins;

/// Unified error handling with HTTP responses
pub mod errors;

/// Structured logging setup
pub mod logging;

/// HTTP middleware (app session auth, CORS)
pub mod middleware;

/// Domain models shared across layers
pub mod models;

/// `OAuth` session store, token lifecycle manager and partner registrar
pub mod oauth;

/// Provider-facing `OAuth2` client, `PKCE` and token codec
pub mod oauth2_client;

/// Vehicle data adapters (mock and Fleet API)
pub mod providers;

/// Shared server resources injected into route handlers
pub mod resources;

/// HTTP route handlers
pub mod routes;

/// HTTP server assembly and lifecycle
pub mod server;

/// Utilities (HTTP clients, clocks)
pub mod utils;
